use crate::workflow::config::SimulatorConfig;
use crate::workflow::runner::DetectionRun;
use anyhow::Context;
use chrono::{DateTime, Utc};
use ecobotcore::detection::export_file_name;
use ecobotcore::overlay::{fit_within, ImageGeometry, RasterSurface, RenderOutcome, Size};
use ecobotcore::ResultsView;
use std::fs;
use std::path::{Path, PathBuf};

/// Files written for one offline run.
#[derive(Debug)]
pub struct OfflineArtifacts {
    pub overlay_png: PathBuf,
    pub export_json: PathBuf,
    pub outcome: RenderOutcome,
}

/// Container size and display geometry used to lay out an image of the
/// given natural size.
pub fn layout_for(config: &SimulatorConfig, natural: Size) -> (Size, ImageGeometry) {
    let display = fit_within(natural, config.container_width, config.max_display_height);
    let container = Size::new(config.container_width, display.height);
    (container, ImageGeometry::new(natural, display))
}

/// Renders the overlay over `image_bytes` and writes it next to the export.
pub fn write_artifacts(
    config: &SimulatorConfig,
    run: &DetectionRun,
    image_bytes: &[u8],
    filter: Option<&str>,
    at: DateTime<Utc>,
) -> anyhow::Result<OfflineArtifacts> {
    let backdrop = image::load_from_memory(image_bytes)
        .with_context(|| format!("decoding {}", run.image_name))?;
    let natural = Size::from(run.natural_size);
    let (container, geometry) = layout_for(config, natural);

    let mut view = ResultsView::new(config.category_palette()?);
    let ticket = view.show(run.results.clone(), run.image_name.clone());
    view.set_layout(container, geometry.display);
    view.image_loaded(&ticket, natural);
    if let Some(class) = filter {
        view.toggle_filter(class);
    }

    let mut surface = match config.font_path.as_ref() {
        Some(path) => RasterSurface::with_font(
            RasterSurface::load_font(path).context("loading label font")?,
        ),
        None => RasterSurface::new(),
    };
    let outcome = view.render(Some(&mut surface));
    let composed = surface.compose_over(&backdrop, geometry);

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let overlay_png = config
        .output_dir
        .join(format!("ecobot-overlay-{}.png", at.timestamp_millis()));
    composed
        .save(&overlay_png)
        .with_context(|| format!("writing {}", overlay_png.display()))?;

    let export_json = config.output_dir.join(export_file_name(at));
    write_export(&view, at, &export_json)?;

    Ok(OfflineArtifacts {
        overlay_png,
        export_json,
        outcome,
    })
}

fn write_export(view: &ResultsView, at: DateTime<Utc>, path: &Path) -> anyhow::Result<()> {
    let json = view
        .export(at)
        .to_json_pretty()
        .context("serializing detection export")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
