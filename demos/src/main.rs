//! End-to-end walkthrough: writes a tiny TypeScript project to a temp
//! directory, indexes it with the ingestion service, then drives the query
//! engine and both output formats against the result. Not part of the
//! published API — a smoke test a human can read.
//!
//! Run with: `cargo run -p codegraph-walkthrough`

use codegraph_cache::EmbeddingCache;
use codegraph_core::PackageConfig;
use codegraph_graph::{CodeGraph, PathOptions, TraversalOptions};
use codegraph_ingest::IngestionService;
use codegraph_query::{dependencies_of, dependents_of, paths_between, render, OutputFormat, QueryOptions};
use codegraph_vector::{DeterministicFakeBackend, EmbeddingPool, HybridIndex};
use tracing::{info, Level};

const USER_SERVICE_TS: &str = r#"
export interface User {
    id: number;
    name: string;
}

export class UserService {
    private users: User[] = [];

    save(user: User): void {
        this.users.push(user);
        notify(user);
    }

    findById(id: number): User | undefined {
        return this.users.find(u => u.id === id);
    }
}

function notify(user: User): void {
    console.log(`saved ${user.name}`);
}
"#;

const CONTROLLER_TS: &str = r#"
import { UserService } from "./user_service";

export class UserController {
    private service: UserService;

    constructor(service: UserService) {
        this.service = service;
    }

    createUser(name: string): void {
        this.service.save({ id: 1, name });
    }
}
"#;

fn write_sample_project(root: &std::path::Path) -> std::io::Result<()> {
    std::fs::write(root.join("user_service.ts"), USER_SERVICE_TS)?;
    std::fs::write(root.join("controller.ts"), CONTROLLER_TS)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let workdir = tempfile::tempdir()?;
    let project_dir = workdir.path().join("project");
    std::fs::create_dir_all(&project_dir)?;
    write_sample_project(&project_dir)?;

    let graph = CodeGraph::open(&workdir.path().join("graph.db"))?;
    let search_index = HybridIndex::new();
    let pool = EmbeddingPool::new(DeterministicFakeBackend::new(), 4);
    pool.initialize()?;
    let cache = EmbeddingCache::new();
    let packages = vec![PackageConfig {
        name: "demo".to_string(),
        compilation_root_path: project_dir,
    }];

    let service = IngestionService::new(
        graph,
        search_index,
        pool,
        cache,
        None,
        packages,
        workdir.path().join("manifest.json"),
        300,
    )?;

    let outcome = service.run_initial_index().await?;
    info!(files = outcome.file_results.len(), "initial index complete");

    let graph = service.graph();
    let deps = dependencies_of(
        graph,
        Some("controller.ts"),
        "UserController.createUser",
        &TraversalOptions::default(),
        &QueryOptions::default(),
    )?;
    println!("--- dependencies_of(UserController.createUser) ---");
    if let Some(message) = &deps.message {
        println!("{message}");
    }
    println!("{}", render(&deps, OutputFormat::Mcp));

    let dependents = dependents_of(
        graph,
        Some("user_service.ts"),
        "UserService.save",
        &TraversalOptions::default(),
        &QueryOptions::default(),
    )?;
    println!("--- dependents_of(UserService.save) ---");
    println!("{}", render(&dependents, OutputFormat::Mermaid));

    let paths = paths_between(
        graph,
        Some("controller.ts"),
        "UserController.createUser",
        Some("user_service.ts"),
        "notify",
        &PathOptions::default(),
    )?;
    println!("--- paths_between(createUser, notify) ---");
    if let Some(message) = &paths.message {
        println!("{message}");
    }
    println!("{}", render(&paths, OutputFormat::Mcp));

    Ok(())
}
