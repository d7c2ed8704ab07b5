use anyhow::Result;
use clap::Parser;
use manifest_splitter::{split, telemetry};

#[cfg(all(
	target_os = "linux",
	feature = "mimalloc",
	not(feature = "system-alloc")
))]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

/// Split Kubernetes manifests into namespaces/<ns>/, cluster/ and system/ directories
#[derive(Parser)]
#[command(name = "manifest-splitter")]
#[command(version = env!("SPLITTER_VERSION"))]
struct Cli {
	#[command(flatten)]
	args: split::SplitArgs,
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	telemetry::init(cli.args.log_level)?;

	split::run(cli.args)?;
	Ok(())
}
