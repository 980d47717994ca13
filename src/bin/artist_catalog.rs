use std::fs;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use artist_catalog::app::{Catalog, ChainResult};
use artist_catalog::config::{ConfigLoader, ResolvedConfig};
use artist_catalog::domain::{ArtistDraft, ImageRef, RecordId};
use artist_catalog::error::{CatalogError, ErrorKind};
use artist_catalog::images::{DirImageStore, ImageUpload};
use artist_catalog::normalize::{CountInput, ListInput};
use artist_catalog::output::JsonOutput;
use artist_catalog::store::Store;
use artist_catalog::view::{SortKey, ViewState};

#[derive(Parser)]
#[command(name = "artist-catalog")]
#[command(about = "Catalog of artist records kept as a directory of JSON documents")]
#[command(version, author)]
struct Cli {
    /// Config file (defaults to ./artist-catalog.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding artist documents and images
    #[arg(long, global = true)]
    data_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List artists, filtered and sorted")]
    List(ListArgs),
    #[command(about = "Show one artist")]
    Show { id: String },
    #[command(about = "Create an artist")]
    Add(AddArgs),
    #[command(about = "Update fields of an artist")]
    Update(UpdateArgs),
    #[command(about = "Delete an artist and its images")]
    Delete { id: String },
    #[command(about = "Manage sample images")]
    Sample {
        #[command(subcommand)]
        command: SampleCommand,
    },
    #[command(about = "Manage image files")]
    Image {
        #[command(subcommand)]
        command: ImageCommand,
    },
    #[command(about = "Compose and match trigger-word chains")]
    Chain {
        #[command(subcommand)]
        command: ChainCommand,
    },
    #[command(about = "Export every artist")]
    Export {
        /// Write a zip archive with records and images instead of printing JSON
        #[arg(long)]
        archive: Option<Utf8PathBuf>,
    },
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, default_value = "")]
    search: String,

    /// count, name or date; anything else keeps directory order
    #[arg(long)]
    sort: Option<String>,

    #[arg(long)]
    select: Option<String>,
}

#[derive(Args, Default)]
struct FieldArgs {
    #[arg(long)]
    name: Option<String>,

    /// Comma-separated artist ids
    #[arg(long)]
    ids: Option<String>,

    /// Comma-separated training counts
    #[arg(long)]
    counts: Option<String>,

    #[arg(long)]
    tags: Option<String>,

    #[arg(long)]
    trigger_words: Option<String>,

    #[arg(long)]
    style: Option<String>,

    /// Preview image file to upload
    #[arg(long)]
    preview: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct AddArgs {
    #[command(flatten)]
    fields: FieldArgs,

    /// Read the draft from a JSON file (e.g. one printed by `chain draft`)
    #[arg(long)]
    from_json: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct UpdateArgs {
    id: String,

    #[command(flatten)]
    fields: FieldArgs,
}

#[derive(Subcommand)]
enum SampleCommand {
    #[command(about = "Upload sample images and append them to an artist")]
    Add {
        id: String,
        #[arg(required = true)]
        files: Vec<Utf8PathBuf>,
    },
    #[command(about = "Remove the sample image at an index")]
    Delete { id: String, index: usize },
}

#[derive(Subcommand)]
enum ImageCommand {
    #[command(about = "Delete an image file by reference (e.g. /images/foo-sample-1.png)")]
    Delete { image: String },
}

#[derive(Subcommand)]
enum ChainCommand {
    #[command(about = "Append the trigger words of artists to a chain")]
    Append {
        #[arg(long, default_value = "")]
        chain: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    #[command(about = "Find the artists a chain refers to")]
    Match { chain: String },
    #[command(about = "Print a creation draft seeded from a chain")]
    Draft { chain: String },
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CatalogError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CatalogError) -> u8 {
    match error.kind() {
        ErrorKind::Validation => 1,
        ErrorKind::NotFound => 2,
        ErrorKind::Transport => 3,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let catalog = open_catalog(&config)?;

    match cli.command {
        Commands::List(args) => {
            let sort_key = args
                .sort
                .map(SortKey::from)
                .unwrap_or(config.default_sort);
            let mut state = ViewState::new(sort_key)
                .with_search(&args.search)
                .with_selection(args.select.as_deref().map(parse_id).transpose()?);
            let view = catalog.view(&mut state)?;
            JsonOutput::print_view(&view).into_diagnostic()
        }
        Commands::Show { id } => {
            let record = catalog.record(parse_id(&id)?)?;
            JsonOutput::print_record(&record).into_diagnostic()
        }
        Commands::Add(args) => {
            let mut draft = match &args.from_json {
                Some(path) => fs::read_to_string(path.as_std_path())
                    .map_err(|err| CatalogError::Filesystem(format!("read {path}: {err}")))?
                    .parse::<ArtistDraft>()?,
                None => ArtistDraft::default(),
            };
            let preview = args.fields.preview.as_deref().map(ImageUpload::from_path).transpose()?;
            apply_fields(&mut draft, args.fields);
            let record = catalog.create_record(draft, preview.as_ref())?;
            JsonOutput::print_record(&record).into_diagnostic()
        }
        Commands::Update(args) => {
            let id = parse_id(&args.id)?;
            let preview = args.fields.preview.as_deref().map(ImageUpload::from_path).transpose()?;
            let mut draft = ArtistDraft::default();
            apply_fields(&mut draft, args.fields);
            let record = catalog.replace_record(id, draft, preview.as_ref())?;
            JsonOutput::print_record(&record).into_diagnostic()
        }
        Commands::Delete { id } => {
            let result = catalog.delete_record(parse_id(&id)?)?;
            JsonOutput::print_delete(&result).into_diagnostic()
        }
        Commands::Sample { command } => match command {
            SampleCommand::Add { id, files } => {
                let uploads = files
                    .iter()
                    .map(|path| ImageUpload::from_path(path))
                    .collect::<Result<Vec<_>, _>>()?;
                let record = catalog.add_sample_images(parse_id(&id)?, &uploads)?;
                JsonOutput::print_record(&record).into_diagnostic()
            }
            SampleCommand::Delete { id, index } => {
                let record = catalog.delete_sample_image(parse_id(&id)?, index)?;
                JsonOutput::print_record(&record).into_diagnostic()
            }
        },
        Commands::Image { command } => match command {
            ImageCommand::Delete { image } => {
                catalog.delete_image(&ImageRef::new(image))?;
                Ok(())
            }
        },
        Commands::Chain { command } => match command {
            ChainCommand::Append { chain, ids } => {
                let ids = ids
                    .iter()
                    .map(|id| parse_id(id))
                    .collect::<Result<Vec<_>, _>>()?;
                let chain = catalog.append_to_chain(&chain, &ids)?;
                JsonOutput::print_chain(&ChainResult { chain }).into_diagnostic()
            }
            ChainCommand::Match { chain } => {
                let result = catalog.match_chain(&chain)?;
                JsonOutput::print_chain_match(&result).into_diagnostic()
            }
            ChainCommand::Draft { chain } => {
                let draft = catalog.chain_draft(&chain)?;
                JsonOutput::print_draft(&draft).into_diagnostic()
            }
        },
        Commands::Export { archive } => match archive {
            Some(dest) => {
                let result = catalog.export_archive(&dest)?;
                JsonOutput::print_export(&result).into_diagnostic()
            }
            None => {
                let records = catalog.export_all()?;
                JsonOutput::print_records(&records).into_diagnostic()
            }
        },
    }
}

fn open_catalog(config: &ResolvedConfig) -> Result<Catalog<DirImageStore>, CatalogError> {
    let store = Store::open(config.data_dir.clone())?;
    let images = DirImageStore::new(config.data_dir.clone()).with_max_bytes(config.max_image_bytes);
    Ok(Catalog::new(store, images).with_duplicate_policy(config.duplicate_policy))
}

fn parse_id(value: &str) -> Result<RecordId, CatalogError> {
    value.parse()
}

/// Command-line fields override whatever the draft already carries.
fn apply_fields(draft: &mut ArtistDraft, fields: FieldArgs) {
    if let Some(name) = fields.name {
        draft.name = Some(name);
    }
    if let Some(ids) = fields.ids {
        draft.artist_ids = Some(ListInput::Joined(ids));
    }
    if let Some(counts) = fields.counts {
        draft.training_counts = Some(CountInput::from(counts.as_str()));
    }
    if let Some(tags) = fields.tags {
        draft.tags = Some(ListInput::Joined(tags));
    }
    if let Some(words) = fields.trigger_words {
        draft.trigger_words = Some(ListInput::Joined(words));
    }
    if let Some(style) = fields.style {
        draft.style_description = Some(style);
    }
}
