use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use folder_viewer::app::events::UserEvent;
use folder_viewer::app::state::AppState;
use folder_viewer::app::view_model::{effective_expanded_paths, generate_ui_state, UiState};
use folder_viewer::app::commands;
use folder_viewer::config::settings;
use folder_viewer::core::{ExportFormat, RenderOptions, SortKey, SortOrder, TreeQuery, TreeRenderer};
use folder_viewer::utils::format_file_size;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing_subscriber::EnvFilter;

/// Browse, search, export and batch-rename a local folder selection.
#[derive(Parser, Debug)]
#[command(name = "folder-viewer", version, about)]
struct Cli {
    /// Use this configuration file instead of the platform config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Folders and files to read, as if dropped onto the window
    paths: Vec<PathBuf>,

    /// Read one directory as a picked listing instead
    #[arg(long, conflicts_with_all = ["paths", "manifest"])]
    pick: Option<PathBuf>,

    /// Read relative file paths, one per line, from this manifest
    #[arg(long, conflicts_with = "paths", requires = "base")]
    manifest: Option<PathBuf>,

    /// Directory the manifest paths are relative to
    #[arg(long)]
    base: Option<PathBuf>,

    /// Only keep entries whose name contains this text
    #[arg(long, short)]
    search: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the folder tree
    View {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Sort by name, size, date or type
        #[arg(long)]
        sort: Option<SortKey>,
        /// Sort in descending order
        #[arg(long)]
        desc: bool,
        /// Start with every folder closed
        #[arg(long)]
        collapsed: bool,
        /// Append file sizes
        #[arg(long)]
        sizes: bool,
        /// Print the full view state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the tree as a csv, json, txt or html report
    Export {
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long, short, default_value = "txt")]
        format: ExportFormat,
        /// Directory to write into (defaults to the configured export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Copy the selected files into a directory under pattern-based names
    Rename {
        #[command(flatten)]
        selection: SelectionArgs,
        /// `$N` is the original name without extension, `#` the position
        #[arg(long, short)]
        pattern: Option<String>,
        #[arg(long, short)]
        target: Option<PathBuf>,
        /// Only print the new names
        #[arg(long)]
        dry_run: bool,
    },
    /// Print file and folder counts
    Stats {
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long)]
        json: bool,
    },
}

struct Session {
    state: Arc<Mutex<AppState>>,
    proxy: UnboundedSender<UserEvent>,
    events: UnboundedReceiver<UserEvent>,
}

impl Session {
    fn new(state: AppState) -> Self {
        let (proxy, events) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(state)),
            proxy,
            events,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AppState> {
        self.state.lock().expect("Mutex was poisoned. This should not happen.")
    }

    /// Reads the selection and waits until its tree is loaded.
    async fn load(&mut self, args: &SelectionArgs) -> Result<Box<UiState>> {
        if let Some(manifest) = &args.manifest {
            let text = tokio::fs::read_to_string(manifest)
                .await
                .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
            let base = args.base.clone().unwrap_or_else(|| PathBuf::from("."));
            commands::open_manifest(base, &text, self.proxy.clone(), self.state.clone());
        } else if let Some(dir) = &args.pick {
            commands::open_directory(dir.clone(), self.proxy.clone(), self.state.clone());
        } else if args.paths.is_empty() {
            bail!("Nothing selected: pass at least one path, --pick or --manifest");
        } else {
            commands::open_paths(args.paths.clone(), self.proxy.clone(), self.state.clone());
        }

        let ui = self.wait_for_ingestion().await?;
        if let Some(query) = &args.search {
            commands::update_search(query, self.proxy.clone(), self.state.clone());
        }
        Ok(ui)
    }

    async fn wait_for_ingestion(&mut self) -> Result<Box<UiState>> {
        while let Some(event) = self.events.recv().await {
            match event {
                UserEvent::StateUpdate(ui) if !ui.is_ingesting => return Ok(ui),
                UserEvent::IngestProgress(progress) => {
                    tracing::debug!("{} files found ({})", progress.files_found, progress.current_path);
                }
                UserEvent::ShowError(message) => bail!(message),
                _ => {}
            }
        }
        bail!("Event channel closed before the selection was loaded")
    }

    async fn next_matching<T>(&mut self, mut pick: impl FnMut(UserEvent) -> Option<T>) -> Result<T> {
        while let Some(event) = self.events.recv().await {
            if let Some(value) = pick(event) {
                return Ok(value);
            }
        }
        bail!("Event channel closed")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout only carries the tree or report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = settings::load_config(cli.config.as_deref())?;
    let mut state = AppState::new(config);
    state.config_path = cli.config.clone();
    let mut session = Session::new(state);

    match cli.command {
        Command::View {
            selection,
            sort,
            desc,
            collapsed,
            sizes,
            json,
        } => {
            session.load(&selection).await?;
            let (current_key, current_order) = {
                let state = session.lock();
                (state.sort_key, state.sort_order)
            };
            let order = match (desc, sort) {
                (true, _) => SortOrder::Descending,
                (false, Some(_)) => SortOrder::Ascending,
                (false, None) => current_order,
            };
            let key = sort.unwrap_or(current_key);
            commands::update_sort(key, order, session.proxy.clone(), session.state.clone());
            if collapsed {
                commands::expand_collapse_all(false, session.proxy.clone(), session.state.clone());
            }

            let state = session.lock();
            if json {
                println!("{}", serde_json::to_string_pretty(&generate_ui_state(&state))?);
            } else {
                let visible = state.visible_forest();
                let expanded = effective_expanded_paths(&state, &visible);
                let options = RenderOptions {
                    root_label: Some(state.selection_label.clone()),
                    show_sizes: sizes,
                    expand_all: false,
                };
                print!("{}", TreeRenderer::render(&visible, &expanded, &options));
                if state.skipped_entries > 0 || state.conflicts > 0 {
                    eprintln!(
                        "{} entries could not be read, {} conflicting entries ignored",
                        state.skipped_entries, state.conflicts
                    );
                }
            }
        }
        Command::Export {
            selection,
            format,
            output,
        } => {
            session.load(&selection).await?;
            commands::export_tree(format, output, session.proxy.clone(), session.state.clone()).await;
            let result = session
                .next_matching(|event| match event {
                    UserEvent::ExportComplete(result) => Some(result),
                    _ => None,
                })
                .await?;
            match result {
                Ok(path) => println!("{}", path.display()),
                Err(e) => bail!("Export failed: {e}"),
            }
        }
        Command::Rename {
            selection,
            pattern,
            target,
            dry_run,
        } => {
            session.load(&selection).await?;
            if let Some(pattern) = &pattern {
                commands::set_rename_pattern(pattern, session.proxy.clone(), session.state.clone());
            }
            commands::set_rename_target(target, session.proxy.clone(), session.state.clone());

            if dry_run {
                for item in commands::rename_preview(&session.state).items {
                    println!("{} -> {}", item.original_name, item.new_name);
                }
                return Ok(());
            }

            commands::apply_rename(session.proxy.clone(), session.state.clone()).await;
            let report = session
                .next_matching(|event| match event {
                    UserEvent::RenameComplete(result) => Some(result),
                    _ => None,
                })
                .await?
                .map_err(anyhow::Error::msg)?;
            for path in &report.written {
                println!("{}", path.display());
            }
            for (source, reason) in &report.failed {
                eprintln!("failed: {} ({})", source.display(), reason);
            }
        }
        Command::Stats { selection, json } => {
            session.load(&selection).await?;
            let stats = TreeQuery::stats(&session.lock().visible_forest());
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Files:   {}", stats.total_files);
                println!("Folders: {}", stats.total_folders);
                println!("Size:    {}", format_file_size(stats.total_size));
                for (extension, count) in &stats.file_types {
                    let label = if extension.is_empty() { "(none)" } else { extension.as_str() };
                    println!("  {label}: {count}");
                }
            }
        }
    }

    Ok(())
}
