use crate::cli::{LibraryArgs, LibraryBuildArgs, LibraryCommands};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use sicdock::core::docking::linker::MIN_LOOP_LENGTH;
use sicdock::core::io::fragment::TomlFragmentFile;
use sicdock::core::io::traits::FragmentFile;
use sicdock::core::loops::LoopHashParams;
use sicdock::engine::progress::ProgressReporter;
use sicdock::workflows;
use tracing::info;

pub fn run(args: LibraryArgs) -> Result<()> {
    match args.command {
        LibraryCommands::Build(build_args) => handle_build(build_args),
    }
}

fn handle_build(args: LibraryBuildArgs) -> Result<()> {
    if args.max_loop_length < MIN_LOOP_LENGTH {
        return Err(CliError::Argument(format!(
            "--max-loop-length must be at least {}, got {}",
            MIN_LOOP_LENGTH, args.max_loop_length
        )));
    }
    let defaults = LoopHashParams::default();
    let params = LoopHashParams {
        cart_resolution: args.cart_resolution.unwrap_or(defaults.cart_resolution),
        angle_resolution: args.angle_resolution.unwrap_or(defaults.angle_resolution),
    };
    let loop_sizes: Vec<usize> = (MIN_LOOP_LENGTH..=args.max_loop_length).collect();

    let fragments = args
        .inputs
        .iter()
        .map(|path| {
            info!("Loading structure from {:?}", path);
            TomlFragmentFile::read_from_path(path).map_err(|e| CliError::Fragment {
                path: path.clone(),
                source: e,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Harvesting loops of length {}..={} from {} structure(s)...",
        MIN_LOOP_LENGTH,
        args.max_loop_length,
        fragments.len()
    );
    let library = workflows::library::build(&fragments, loop_sizes.clone(), params, &reporter)?;

    library.save(&args.output)?;

    for size in &loop_sizes {
        println!("  L = {:>2}: {} segment(s)", size, library.segment_count(*size));
    }
    println!("✓ Loop library written to: {}", args.output.display());
    Ok(())
}
