//! Whole-project ingestion (spec §4.7 "For the entire project..."): a
//! two-pass sweep over each configured package's compilation root. The first
//! pass extracts every file once, purely to populate a [`ProjectRegistry`] of
//! exported top-level symbols; the second pass re-extracts each file with
//! that registry attached, so cross-file imports resolve regardless of
//! ingestion order.

use std::path::{Path, PathBuf};

use codegraph_core::{PackageConfig, Result};
use codegraph_graph::CodeGraph;
use codegraph_parser::{extract, ExtractionContext, ProjectRegistry, TypeScriptSource};
use codegraph_vector::{EmbeddingPool, HybridIndex, InferenceBackend};

use codegraph_cache::EmbeddingCache;

use crate::pipeline::{self, FileIndexResult};

const SOURCE_EXTENSIONS: [&str; 2] = ["ts", "tsx"];

/// Recursively lists source files under `root`, honoring `.gitignore`-style
/// exclusions (spec §6 "watch.exclude" shares this filtering shape) and
/// skipping ambient `.d.ts` declaration files, which carry no executable
/// bodies to index.
pub fn discover_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut builder = ignore::WalkBuilder::new(root);
    builder.hidden(false);
    for entry in builder.build().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(".d.ts") {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if SOURCE_EXTENSIONS.contains(&ext) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files
}

fn relative_path(root: &Path, absolute: &Path) -> String {
    let relative = absolute.strip_prefix(root).unwrap_or(absolute);
    codegraph_core::normalize_path(&relative.to_string_lossy())
}

/// Outcome of ingesting a whole project: successful per-file results plus
/// per-file errors, so one bad file never aborts the run (spec §4.2.3,
/// §4.7 "Per-file errors are recorded and surfaced in the aggregate result").
#[derive(Debug, Default)]
pub struct ProjectIngestOutcome {
    pub file_results: Vec<FileIndexResult>,
    pub errors: Vec<(String, String)>,
}

pub async fn ingest_project<B: InferenceBackend>(
    graph: &CodeGraph,
    search_index: &HybridIndex,
    pool: &EmbeddingPool<B>,
    cache: &EmbeddingCache,
    document_prefix: Option<&str>,
    packages: &[PackageConfig],
) -> Result<ProjectIngestOutcome> {
    let mut files_by_package: Vec<(String, PathBuf, Vec<PathBuf>)> = Vec::new();
    for package in packages {
        let files = discover_files(&package.compilation_root_path);
        files_by_package.push((package.name.clone(), package.compilation_root_path.clone(), files));
    }

    // Pass 1: populate the cross-file export registry. Parse failures here
    // are swallowed — pass 2 re-parses and records the real error there.
    let mut registry = ProjectRegistry::new();
    for (package_name, root, files) in &files_by_package {
        for path in files {
            let Ok(content) = std::fs::read_to_string(path) else {
                continue;
            };
            let Ok(source) = TypeScriptSource::parse_for_path(&content, path) else {
                continue;
            };
            let relative = relative_path(root, path);
            let ctx = ExtractionContext::new(&relative, package_name);
            let outcome = extract(&source, &ctx);
            for node in &outcome.nodes {
                if node.exported {
                    registry.record(&node.file_path, &node.name, node.id.clone());
                }
            }
        }
    }

    // Pass 2: real ingestion, with the registry available for import resolution.
    let mut result = ProjectIngestOutcome::default();
    for (package_name, root, files) in &files_by_package {
        for path in files {
            let relative = relative_path(root, path);
            let outcome = ingest_one(
                graph,
                search_index,
                pool,
                cache,
                document_prefix,
                &registry,
                path,
                &relative,
                package_name,
            )
            .await;
            match outcome {
                Ok(file_result) => result.file_results.push(file_result),
                Err(e) => result.errors.push((relative, e.to_string())),
            }
        }
    }

    Ok(result)
}

#[allow(clippy::too_many_arguments)]
async fn ingest_one<B: InferenceBackend>(
    graph: &CodeGraph,
    search_index: &HybridIndex,
    pool: &EmbeddingPool<B>,
    cache: &EmbeddingCache,
    document_prefix: Option<&str>,
    registry: &ProjectRegistry,
    path: &Path,
    relative_path: &str,
    package_name: &str,
) -> Result<FileIndexResult> {
    let content = std::fs::read_to_string(path)?;
    let source =
        TypeScriptSource::parse_for_path(&content, path).map_err(|e| codegraph_core::CodeGraphError::validation(e.to_string()))?;
    let ctx = ExtractionContext::new(relative_path, package_name).with_registry(registry);

    pipeline::clear_file(graph, search_index, relative_path)?;
    pipeline::ingest_file(graph, search_index, pool, cache, document_prefix, &source, &ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_vector::DeterministicFakeBackend;

    fn setup() -> (tempfile::TempDir, CodeGraph, HybridIndex, EmbeddingPool<DeterministicFakeBackend>, EmbeddingCache) {
        let dir = tempfile::tempdir().unwrap();
        let graph = CodeGraph::open(&dir.path().join("graph.db")).unwrap();
        let search_index = HybridIndex::new();
        let pool = EmbeddingPool::new(DeterministicFakeBackend::new(), 1);
        pool.initialize().unwrap();
        let cache = EmbeddingCache::new();
        (dir, graph, search_index, pool, cache)
    }

    #[tokio::test]
    async fn ingests_every_source_file_in_the_compilation_root() {
        let (dir, graph, search_index, pool, cache) = setup();
        let project_dir = dir.path().join("proj");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("a.ts"), "export function fnA(): void {}\n").unwrap();
        std::fs::write(project_dir.join("b.ts"), "export function fnB(): void {}\n").unwrap();
        std::fs::write(project_dir.join("b.d.ts"), "export declare function skipped(): void;\n").unwrap();

        let packages = vec![PackageConfig {
            name: "root".to_string(),
            compilation_root_path: project_dir.clone(),
        }];

        let outcome = ingest_project(&graph, &search_index, &pool, &cache, None, &packages)
            .await
            .unwrap();

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.file_results.len(), 2);
        assert_eq!(search_index.len(), 2);
    }

    #[tokio::test]
    async fn cross_file_import_resolves_through_the_project_registry() {
        let (dir, graph, search_index, pool, cache) = setup();
        let project_dir = dir.path().join("proj");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("util.ts"), "export function helper(): void {}\n").unwrap();
        std::fs::write(
            project_dir.join("a.ts"),
            "import { helper } from './util';\nexport function caller(): void { helper(); }\n",
        )
        .unwrap();

        let packages = vec![PackageConfig {
            name: "root".to_string(),
            compilation_root_path: project_dir,
        }];

        let outcome = ingest_project(&graph, &search_index, &pool, &cache, None, &packages)
            .await
            .unwrap();
        assert!(outcome.errors.is_empty());

        let caller = graph.find_nodes_by_symbol("caller", Some("a.ts"));
        assert_eq!(caller.len(), 1);
        let deps = graph
            .query_dependencies(&caller[0].id, &codegraph_graph::TraversalOptions::default())
            .unwrap();
        assert!(deps.iter().any(|e| e.target.as_str().ends_with(":Function:helper")));
    }
}
