//! Tree mutation
//!
//! Reparents and repositions nodes, keeps sibling ordering dense, and
//! preserves stale addresses by recording redirects when a move changes a
//! variant's externally resolved address.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::{Node, NodeId, Redirect, RedirectStatus, VariantId};
use crate::repository::{AddressResolver, CacheInvalidator, ContentRepository};

/// Moves nodes within the content tree
pub struct TreeMover {
	repo: Arc<dyn ContentRepository>,
	resolver: Arc<dyn AddressResolver>,
	cache: Arc<dyn CacheInvalidator>,
}

impl TreeMover {
	/// Creates a mover over the given collaborators
	pub fn new(
		repo: Arc<dyn ContentRepository>,
		resolver: Arc<dyn AddressResolver>,
		cache: Arc<dyn CacheInvalidator>,
	) -> Self {
		Self {
			repo,
			resolver,
			cache,
		}
	}

	/// Reparents/repositions a node
	///
	/// Refuses to move a locked node unless `force` is set, and rejects a
	/// new parent whose ancestor chain contains the moved node. With
	/// `cleanup`, the move is persisted immediately and all siblings under
	/// the (possibly new) parent are renumbered to a dense `1..N` ordering;
	/// root-level nodes are renumbered via a dedicated root-scope pass.
	/// Invalidates the downstream response cache after a successful move.
	pub async fn move_node(
		&self,
		node_id: NodeId,
		new_parent: Option<NodeId>,
		position: i32,
		force: bool,
		cleanup: bool,
	) -> EngineResult<Node> {
		let mut node = self.repo.node(node_id).await?;
		if node.locked && !force {
			return Err(EngineError::LockedEntity(node.id));
		}
		if let Some(parent) = new_parent {
			self.guard_cycle(node_id, parent).await?;
		}

		node.parent = new_parent;
		node.position = position;
		self.repo.persist_node(&node).await?;
		debug!(node = %node.id, parent = ?new_parent, position, "moved node");

		if cleanup {
			self.repo.flush().await?;
			match new_parent {
				Some(parent) => self.renumber_children(parent).await?,
				None => self.renumber_roots().await?,
			}
			self.repo.flush().await?;
		}

		self.cache.flush_all().await?;
		self.repo.node(node_id).await
	}

	/// Rejects moves where the new parent's ancestor chain contains the
	/// moved node (a node reparented under its own descendant)
	async fn guard_cycle(&self, node_id: NodeId, new_parent: NodeId) -> EngineResult<()> {
		if new_parent == node_id {
			return Err(EngineError::MoveCycle {
				node: node_id,
				parent: new_parent,
			});
		}
		let mut seen: HashSet<NodeId> = HashSet::new();
		let mut cursor = Some(new_parent);
		while let Some(current) = cursor {
			if current == node_id {
				return Err(EngineError::MoveCycle {
					node: node_id,
					parent: new_parent,
				});
			}
			if !seen.insert(current) {
				break;
			}
			cursor = self.repo.node(current).await?.parent;
		}
		Ok(())
	}

	async fn renumber_children(&self, parent: NodeId) -> EngineResult<()> {
		self.renumber(Some(parent)).await
	}

	/// Dedicated pass for parentless nodes
	async fn renumber_roots(&self) -> EngineResult<()> {
		self.renumber(None).await
	}

	async fn renumber(&self, parent: Option<NodeId>) -> EngineResult<()> {
		let siblings = self.repo.children_of(parent).await?;
		for (index, mut sibling) in siblings.into_iter().enumerate() {
			let dense = (index + 1) as i32;
			if sibling.position != dense {
				sibling.position = dense;
				self.repo.persist_node(&sibling).await?;
			}
		}
		Ok(())
	}

	/// Captures the current externally resolved address of every variant of
	/// a node, to be passed to [`record_redirects`] after a mutation
	///
	/// [`record_redirects`]: TreeMover::record_redirects
	pub async fn capture_addresses(
		&self,
		node_id: NodeId,
	) -> EngineResult<Vec<(VariantId, String)>> {
		let mut addresses = Vec::new();
		for variant in self.repo.variants_of(node_id).await? {
			let address = self.resolver.address_of(&variant).await?;
			addresses.push((variant.id, address));
		}
		Ok(addresses)
	}

	/// Upserts a permanent redirect for every variant whose address changed
	/// since `before` was captured
	///
	/// Empty and root addresses are never redirected. When the new address
	/// collides with an existing redirect's source, that stale redirect is
	/// deleted first so no redirect loop can form. Returns the number of
	/// redirects written.
	pub async fn record_redirects(
		&self,
		node_id: NodeId,
		before: &[(VariantId, String)],
	) -> EngineResult<usize> {
		let variants = self.repo.variants_of(node_id).await?;
		let mut written = 0;
		for (variant_id, old_address) in before {
			let Some(variant) = variants.iter().find(|v| v.id == *variant_id) else {
				continue;
			};
			let new_address = self.resolver.address_of(variant).await?;
			if new_address == *old_address {
				continue;
			}
			if old_address.is_empty() || old_address == "/" {
				continue;
			}

			if let Some(stale) = self.repo.redirect_by_source(&new_address).await? {
				debug!(source = %new_address, "deleting stale redirect");
				self.repo.remove_redirect(stale.id).await?;
			}

			let redirect = match self.repo.redirect_by_source(old_address).await? {
				Some(mut existing) => {
					existing.target = *variant_id;
					existing.status = RedirectStatus::Permanent;
					existing
				}
				None => Redirect {
					id: Uuid::new_v4(),
					source: old_address.clone(),
					target: *variant_id,
					status: RedirectStatus::Permanent,
				},
			};
			self.repo.persist_redirect(&redirect).await?;
			debug!(source = %old_address, target = %variant_id, "recorded redirect");
			written += 1;
		}
		Ok(written)
	}
}
