//! Materialized path and SEO slug builder for tree-shaped entities.
//!
//! Runs after a full sync pass. The whole node set is loaded into memory
//! as an adjacency map; each node's ancestry is walked leaf to root with
//! an explicit visited set and depth bound, so cyclic or over-deep parent
//! references degrade to a logged partial path instead of failing the
//! pass.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use catalog_sync_repository::SqliteTargetRepository;
use catalog_sync_shared::{ComputedPaths, EntityMapping, HierarchyNode};

use crate::errors::SyncError;

/// Upper bound on ancestry walk depth.
pub const MAX_DEPTH: usize = 50;

/// Separator used for both the human path and the id path.
pub const PATH_SEPARATOR: &str = "/";

/// Fixed top-level segment every SEO slug path is rooted at.
pub const SEO_ROOT_SEGMENT: &str = "de";

/// Name-to-slug capability; transliteration is supplied by the caller.
pub type Slugify = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Default slugifier: lowercased, umlauts transliterated, everything else
/// non-alphanumeric collapsed to single dashes.
pub fn default_slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut dash_pending = false;
    for ch in name.to_lowercase().chars() {
        let mapped: &str = match ch {
            'ä' => "ae",
            'ö' => "oe",
            'ü' => "ue",
            'ß' => "ss",
            c if c.is_ascii_alphanumeric() => {
                if dash_pending && !out.is_empty() {
                    out.push('-');
                }
                dash_pending = false;
                out.push(c);
                continue;
            }
            _ => {
                dash_pending = true;
                continue;
            }
        };
        if dash_pending && !out.is_empty() {
            out.push('-');
        }
        dash_pending = false;
        out.push_str(mapped);
    }
    out
}

/// Memoization slot for the recursive slug computation. The `Computing`
/// marker is what keeps a cycle from recursing forever: a node consulted
/// while its own slug is still being computed falls back to the root
/// segment.
enum SlugEntry {
    Computing,
    Done(String),
}

/// Pure path computation over an in-memory adjacency map.
pub struct PathBuilder {
    nodes: HashMap<i64, HierarchyNode>,
    order: Vec<i64>,
    slugify: Slugify,
}

impl PathBuilder {
    pub fn new(nodes: Vec<HierarchyNode>, slugify: Slugify) -> Self {
        let mut order: Vec<i64> = nodes.iter().map(|n| n.id).collect();
        order.sort_unstable();
        let nodes = nodes.into_iter().map(|n| (n.id, n)).collect();
        Self { nodes, order, slugify }
    }

    /// Compute `path`, `path_ids` and `seo_url` for every node, in id order.
    pub fn compute_all(&self) -> Vec<ComputedPaths> {
        let mut slugs: HashMap<i64, SlugEntry> = HashMap::new();
        self.order
            .iter()
            .map(|&id| {
                let chain = self.ancestor_chain(id);
                let path = chain
                    .iter()
                    .map(|(_, name)| name.as_str())
                    .filter(|name| !name.is_empty())
                    .collect::<Vec<_>>()
                    .join(PATH_SEPARATOR);
                let path_ids = chain
                    .iter()
                    .map(|(node_id, _)| node_id.to_string())
                    .collect::<Vec<_>>()
                    .join(PATH_SEPARATOR);
                let seo_url = self.seo_slug(id, &mut slugs);
                ComputedPaths { id, path, path_ids, seo_url }
            })
            .collect()
    }

    /// Walk leaf to root, returning the chain in root-to-leaf order.
    fn ancestor_chain(&self, origin: i64) -> Vec<(i64, String)> {
        let mut chain = Vec::new();
        let mut visited: HashSet<i64> = HashSet::new();
        let mut current = Some(origin);
        while let Some(id) = current {
            if !visited.insert(id) {
                warn!(node = origin, revisited = id, "Cycle in category parents, using partial path");
                break;
            }
            if chain.len() >= MAX_DEPTH {
                warn!(node = origin, depth = MAX_DEPTH, "Category ancestry exceeds depth bound, using partial path");
                break;
            }
            let Some(node) = self.nodes.get(&id) else {
                // dangling parent reference
                break;
            };
            chain.push((id, node.name.trim().to_string()));
            current = node.parent_id;
        }
        chain.reverse();
        chain
    }

    /// Memoized recursive slug path: `slug(parent) + "/" + slugify(name)`.
    fn seo_slug(&self, id: i64, cache: &mut HashMap<i64, SlugEntry>) -> String {
        match cache.get(&id) {
            Some(SlugEntry::Done(slug)) => return slug.clone(),
            Some(SlugEntry::Computing) => {
                warn!(node = id, "Cycle during slug computation, falling back to root segment");
                return SEO_ROOT_SEGMENT.to_string();
            }
            None => {}
        }
        cache.insert(id, SlugEntry::Computing);

        let parent_slug = self
            .nodes
            .get(&id)
            .and_then(|node| node.parent_id)
            .filter(|parent| self.nodes.contains_key(parent))
            .map(|parent| self.seo_slug(parent, cache))
            .unwrap_or_else(|| SEO_ROOT_SEGMENT.to_string());

        let name = self
            .nodes
            .get(&id)
            .map(|node| node.name.as_str())
            .unwrap_or_default();
        let slug = format!("{parent_slug}{PATH_SEPARATOR}{}", (self.slugify)(name));
        cache.insert(id, SlugEntry::Done(slug.clone()));
        slug
    }
}

/// Database-facing hierarchy pass: load nodes, compute, write back what
/// changed.
pub struct HierarchyPass {
    targets: SqliteTargetRepository,
    slugify: Slugify,
}

impl HierarchyPass {
    pub fn new(targets: SqliteTargetRepository) -> Self {
        Self { targets, slugify: Arc::new(default_slugify) }
    }

    pub fn with_slugify(mut self, slugify: Slugify) -> Self {
        self.slugify = slugify;
        self
    }

    /// Rebuild derived paths for a tree-shaped entity. Returns the number
    /// of nodes whose derived values actually changed.
    pub async fn rebuild(&self, mapping: &EntityMapping) -> Result<i64, SyncError> {
        let tree = mapping
            .tree
            .as_ref()
            .ok_or_else(|| SyncError::NotTreeShaped(mapping.entity.clone()))?;

        let nodes = self.targets.load_nodes(mapping, tree).await?;
        let node_count = nodes.len();
        let builder = PathBuilder::new(nodes, self.slugify.clone());

        let mut updated = 0_i64;
        for computed in builder.compute_all() {
            if self.targets.write_paths(mapping, &computed).await? {
                updated += 1;
            }
        }
        info!(entity = %mapping.entity, nodes = node_count, updated, "Rebuilt hierarchy paths");
        Ok(updated)
    }
}
