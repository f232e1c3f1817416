use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "meshchain")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

/// Arguments shared by every node role
#[derive(Debug, Args)]
pub struct NodeArgs {
    #[arg(short = 'n', long, help = "Node name (defaults to node-<uuid>)")]
    pub name: Option<String>,

    #[arg(short = 'p', long, help = "UDP port the node gossips on")]
    pub port: Option<u16>,

    #[arg(long, help = "Snapshot file to load the ledger from")]
    pub file: Option<String>,

    #[arg(
        short = 'o',
        long,
        help = "Output file for the snapshot when no input file is given"
    )]
    pub output: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        name = "fullnode",
        about = "Run a full node that validates and relays blocks and transactions"
    )]
    FullNode {
        #[command(flatten)]
        args: NodeArgs,
    },
    #[command(name = "minernode", about = "Run a full node that also mines new blocks")]
    MinerNode {
        #[command(flatten)]
        args: NodeArgs,
    },
    #[command(
        name = "spvnode",
        about = "Run a header-only node using confirmation-depth settlement"
    )]
    SpvNode {
        #[command(flatten)]
        args: NodeArgs,
    },
    #[command(name = "inspect", about = "Print the blocks of a ledger snapshot")]
    Inspect {
        #[arg(long, help = "Snapshot file to read")]
        file: String,
    },
}
