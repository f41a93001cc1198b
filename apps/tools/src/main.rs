use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use render_gateway::{CameraIntrinsics, HttpRenderer, Model, ModelCatalog, ModelManager};
use shared::{domain::ModelId, pose::Pose};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "./models")]
    catalog_dir: PathBuf,
    #[arg(long, default_value = "http://127.0.0.1:8500")]
    renderer_url: String,
    #[arg(long, default_value_t = 30)]
    render_timeout_seconds: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List,
    Inspect {
        model: String,
    },
    AssetPose {
        model: String,
        index: usize,
    },
    Nearest {
        model: String,
        #[arg(long)]
        asset_index: Option<usize>,
        #[arg(long, default_value_t = 3)]
        count: usize,
    },
    Render {
        model: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        asset_index: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let renderer = HttpRenderer::new(
        &cli.renderer_url,
        Duration::from_secs(cli.render_timeout_seconds),
    )?;
    let catalog = ModelCatalog::load(
        &cli.catalog_dir,
        Arc::new(renderer),
        CameraIntrinsics::default(),
    )?;

    match cli.command {
        Command::List => {
            for model_id in catalog.list_models().await {
                if let Some(model) = catalog.model(&model_id) {
                    println!(
                        "{model_id}\treferences={}\tassets={}",
                        model.reference_count(),
                        model.asset_count()
                    );
                }
            }
        }
        Command::Inspect { model } => {
            let model = lookup(&catalog, &model).await?;
            let init_pose = model.init_pose();
            let (rotation, translation) = init_pose.decompose()?;
            let params = model.flight_params(&rotation, &translation);
            println!("model {}", model.id());
            println!("init_pose {}", serde_json::to_string(&init_pose)?);
            println!(
                "flight altitude={:.3} heading={:.1}",
                params.altitude, params.heading
            );
        }
        Command::AssetPose { model, index } => {
            let descriptor = catalog.asset_pose(&ModelId::new(model), index).await?;
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
        Command::Nearest {
            model,
            asset_index,
            count,
        } => {
            let pose = resolve_pose(&catalog, &model, asset_index).await?;
            let model = lookup(&catalog, &model).await?;
            for file in model.nearest_images(&pose, count) {
                println!("{file}");
            }
        }
        Command::Render {
            model,
            out,
            asset_index,
        } => {
            let pose = resolve_pose(&catalog, &model, asset_index).await?;
            let model = lookup(&catalog, &model).await?;
            let bytes = model.render_image(&pose).await?;
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("failed to write '{}'", out.display()))?;
            println!("wrote {} bytes to {}", bytes.len(), out.display());
        }
    }

    Ok(())
}

async fn lookup(catalog: &ModelCatalog, model: &str) -> Result<Arc<dyn Model>> {
    catalog
        .get_model(&ModelId::from(model))
        .await
        .ok_or_else(|| anyhow!("unknown model {model}"))
}

async fn resolve_pose(
    catalog: &ModelCatalog,
    model: &str,
    asset_index: Option<usize>,
) -> Result<Pose> {
    match asset_index {
        Some(index) => {
            let descriptor = catalog.asset_pose(&ModelId::from(model), index).await?;
            Ok(descriptor.decode()?)
        }
        None => Ok(lookup(catalog, model).await?.init_pose()),
    }
}
