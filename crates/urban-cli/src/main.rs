use std::sync::Arc;

use serde_json::Value;
use urban_adapters::DeterministicEngine;
use urban_core::{ArtifactStatus, CoreError, JobState, PipelineBuilder, Stage, StageStatusView, UrbanPipeline};
use urban_domain::{LifecycleState, NewProject, RoadNetwork, SiteRing};
use urban_persistence::{FsArtifactIndexStore, FsObjectStore, FsProjectStore, StorageConfig};
use uuid::Uuid;

fn main() {
    // Cargar .env si existe para obtener URBANFLOW_DATA_DIR / URBANFLOW_PUBLIC_URL
    let _ = dotenvy::dotenv();
    // CLI mínima contra el directorio de datos, sin pasar por HTTP:
    //   urban-cli create --name <TXT> [--site <GEOJSON>] [--roads <GEOJSON>]
    //   urban-cli generate --project <UUID> --stage <NOMBRE> [--roads <GEOJSON>]
    //   urban-cli status --project <UUID>
    //   urban-cli list
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Uso: urban-cli <create|generate|status|list> [flags]");
        std::process::exit(2);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("[urban] runtime error: {e}");
            std::process::exit(5);
        }
    };
    let pipeline = build_pipeline(&StorageConfig::from_env());

    let code = match args[1].as_str() {
        "create" => {
            let mut name: Option<String> = None;
            let mut description: Option<String> = None;
            let mut site: Option<String> = None;
            let mut roads: Option<String> = None;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--name" => {
                        i += 1;
                        if i < args.len() { name = Some(args[i].clone()); }
                    }
                    "--description" => {
                        i += 1;
                        if i < args.len() { description = Some(args[i].clone()); }
                    }
                    "--site" => {
                        i += 1;
                        if i < args.len() { site = Some(args[i].clone()); }
                    }
                    "--roads" => {
                        i += 1;
                        if i < args.len() { roads = Some(args[i].clone()); }
                    }
                    _ => {}
                }
                i += 1;
            }
            match name {
                Some(name) => runtime.block_on(cmd_create(&pipeline, name, description, site, roads)),
                None => {
                    eprintln!("Uso: urban-cli create --name <TXT> [--site <GEOJSON>] [--roads <GEOJSON>]");
                    2
                }
            }
        }
        "generate" => {
            let mut project: Option<Uuid> = None;
            let mut stage: Option<String> = None;
            let mut roads: Option<String> = None;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--project" => {
                        i += 1;
                        if i < args.len() { project = Uuid::parse_str(&args[i]).ok(); }
                    }
                    "--stage" => {
                        i += 1;
                        if i < args.len() { stage = Some(args[i].clone()); }
                    }
                    "--roads" => {
                        i += 1;
                        if i < args.len() { roads = Some(args[i].clone()); }
                    }
                    _ => {}
                }
                i += 1;
            }
            match (project, stage) {
                (Some(project), Some(stage)) => {
                    runtime.block_on(cmd_generate(&pipeline, project, &stage, roads))
                }
                _ => {
                    eprintln!("Uso: urban-cli generate --project <UUID> --stage <NOMBRE> [--roads <GEOJSON>]");
                    2
                }
            }
        }
        "status" => {
            let mut project: Option<Uuid> = None;
            let mut i = 2;
            while i < args.len() {
                if args[i].as_str() == "--project" {
                    i += 1;
                    if i < args.len() { project = Uuid::parse_str(&args[i]).ok(); }
                }
                i += 1;
            }
            match project {
                Some(project) => runtime.block_on(cmd_status(&pipeline, project)),
                None => {
                    eprintln!("Uso: urban-cli status --project <UUID>");
                    2
                }
            }
        }
        "list" => runtime.block_on(cmd_list(&pipeline)),
        other => {
            eprintln!("[urban] subcomando desconocido: {other}");
            2
        }
    };
    std::process::exit(code);
}

/// Pipeline completo sobre los stores durables del directorio de datos.
fn build_pipeline(config: &StorageConfig) -> UrbanPipeline {
    let engine = Arc::new(DeterministicEngine::new());
    let objects = Arc::new(FsObjectStore::new(&config.data_dir, config.public_base_url.clone()));
    PipelineBuilder::new(engine, objects)
        .with_project_store(Arc::new(FsProjectStore::new(&config.data_dir)))
        .with_artifact_store(Arc::new(FsArtifactIndexStore::new(&config.data_dir)))
        .build()
}

fn load_geojson(path: &str) -> Result<Value, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("{path}: {e}"))
}

/// Código de salida según el tipo de rechazo: 4 para errores de dominio,
/// 5 para fallas de infraestructura.
fn exit_code_for(err: &CoreError) -> i32 {
    match err {
        CoreError::Validation(_)
        | CoreError::NotFound(_)
        | CoreError::DependencyNotReady { .. }
        | CoreError::ConflictSuperseded
        | CoreError::ProjectArchived(_) => 4,
        CoreError::Generation(_) | CoreError::Storage(_) | CoreError::Internal(_) => 5,
    }
}

async fn cmd_create(pipeline: &UrbanPipeline,
                    name: String,
                    description: Option<String>,
                    site_path: Option<String>,
                    roads_path: Option<String>)
                    -> i32 {
    let site = match site_path.as_deref().map(load_geojson).transpose() {
        Ok(value) => value,
        Err(e) => {
            eprintln!("[urban create] sitio ilegible: {e}");
            return 3;
        }
    };
    let roads = match roads_path.as_deref().map(load_geojson).transpose() {
        Ok(value) => value,
        Err(e) => {
            eprintln!("[urban create] red vial ilegible: {e}");
            return 3;
        }
    };
    let site = match site.as_ref().map(SiteRing::from_geojson).transpose() {
        Ok(ring) => ring,
        Err(e) => {
            eprintln!("[urban create] sitio inválido: {e}");
            return 3;
        }
    };
    let roads = match roads.as_ref().map(RoadNetwork::from_geojson).transpose() {
        Ok(network) => network,
        Err(e) => {
            eprintln!("[urban create] red vial inválida: {e}");
            return 3;
        }
    };

    match pipeline.create_project(NewProject { name,
                                               description,
                                               site,
                                               roads,
                                               parameters: None,
                                               metadata: None })
                  .await
    {
        Ok(project) => {
            println!("creado: project={} file={}",
                     project.id(),
                     project.site_file().unwrap_or("n/a"));
            0
        }
        Err(e) => {
            eprintln!("[urban create] error: {e}");
            exit_code_for(&e)
        }
    }
}

async fn cmd_generate(pipeline: &UrbanPipeline,
                      project: Uuid,
                      stage_name: &str,
                      roads_path: Option<String>)
                      -> i32 {
    let stage: Stage = match stage_name.parse() {
        Ok(stage) => stage,
        Err(e) => {
            eprintln!("[urban generate] {e}");
            return 3;
        }
    };
    let aux = match roads_path.as_deref().map(load_geojson).transpose() {
        Ok(value) => value,
        Err(e) => {
            eprintln!("[urban generate] red vial ilegible: {e}");
            return 3;
        }
    };
    let aux = match aux.as_ref().map(RoadNetwork::from_geojson).transpose() {
        Ok(network) => network,
        Err(e) => {
            eprintln!("[urban generate] red vial inválida: {e}");
            return 3;
        }
    };

    match pipeline.generate(project, stage, aux).await {
        Ok(record) => {
            println!("generado: project={} stage={} file={}", project, stage, record.location);
            if let Some(sheet) = &record.summary {
                println!("{sheet}");
            }
            0
        }
        Err(e) => {
            eprintln!("[urban generate] error: {e}");
            exit_code_for(&e)
        }
    }
}

async fn cmd_status(pipeline: &UrbanPipeline, project: Uuid) -> i32 {
    match pipeline.project_status(project).await {
        Ok(views) => {
            for view in views {
                println!("{} {} {}",
                         view.stage,
                         state_label(&view),
                         view.location.as_deref().unwrap_or("-"));
            }
            0
        }
        Err(e) => {
            eprintln!("[urban status] error: {e}");
            exit_code_for(&e)
        }
    }
}

async fn cmd_list(pipeline: &UrbanPipeline) -> i32 {
    match pipeline.list_projects().await {
        Ok(projects) => {
            for project in projects {
                let lifecycle = match project.lifecycle() {
                    LifecycleState::Draft => "draft",
                    LifecycleState::Ready => "ready",
                    LifecycleState::Archived => "archived",
                };
                println!("{} {} {}", project.id(), lifecycle, project.name());
            }
            0
        }
        Err(e) => {
            eprintln!("[urban list] error: {e}");
            exit_code_for(&e)
        }
    }
}

/// Un job vivo manda sobre el registro; sin job decide el registro vigente.
fn state_label(view: &StageStatusView) -> &'static str {
    match view.job_state {
        Some(JobState::Queued) | Some(JobState::Running) => "running",
        _ => match view.status {
            None => "absent",
            Some(ArtifactStatus::Ready) => "fresh",
            Some(ArtifactStatus::Stale) => "stale",
        },
    }
}
