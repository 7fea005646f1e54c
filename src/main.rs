use std::process::ExitCode;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::info;

use campaign_grid::config::{Args, GridConfig};
use campaign_grid::controller::Controller;
use campaign_grid::domain::GridError;
use campaign_grid::export::{export_csv, write_export};
use campaign_grid::logging;
use campaign_grid::model::{Model, Status};
use campaign_grid::pipeline::derive_view;
use campaign_grid::table::Dataset;
use campaign_grid::ui::TableUI;

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<(), GridError> {
    let config = GridConfig::from_args(Args::parse())?;
    logging::init(&config.log_file)?;
    info!("Starting campaign-grid with {:?}", config);

    if config.export_only {
        return export_only(&config);
    }

    let mut terminal = ratatui::init();
    let result = run_tui(&mut terminal, &config);
    ratatui::restore();
    result
}

fn load(config: &GridConfig) -> Result<Dataset, GridError> {
    match &config.data_file {
        Some(path) => Dataset::load(path.clone()),
        None => Ok(Dataset::sample()),
    }
}

fn export_only(config: &GridConfig) -> Result<(), GridError> {
    let dataset = load(config)?;
    let view = derive_view(&dataset, &config.initial_state());
    let bytes = export_csv(&dataset, view.rows())?;
    let path = write_export(&config.export_dir, &bytes)?;
    println!("Exported {} rows to {}", view.len(), path.display());
    Ok(())
}

fn run_tui(terminal: &mut DefaultTerminal, config: &GridConfig) -> Result<(), GridError> {
    let size = terminal.size()?;
    let mut model = Model::init(config, size.width as usize);
    let ui = TableUI::new();
    let controller = Controller::new(config);

    // Show the loading state while the data source is read.
    terminal.draw(|f| ui.draw(&model, f))?;
    model.load_dataset(load(config)?);

    while model.status != Status::Quitting {
        terminal.draw(|f| ui.draw(&model, f))?;

        if let Some(message) = controller.handle_event(&model)? {
            model.update(Some(message))?;
        };
    }

    Ok(())
}
