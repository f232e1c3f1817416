// This is my main entry point for the ledger node CLI
// Each subcommand runs one node role against a UDP broadcast transport
use clap::Parser;
use log::{error, info, LevelFilter};
use meshchain::{
    Command, Ledger, Node, NodeArgs, Opt, Role, Snapshot, Transaction, UdpTransport, GLOBAL_CONFIG,
};
use std::io::{self, BufRead};
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    // Info level gives me enough protocol detail without being too verbose
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::FullNode { args } => run_node(Role::FULL, args),
        Command::MinerNode { args } => run_node(Role::MINER, args),
        Command::SpvNode { args } => run_node(Role::SPV, args),
        Command::Inspect { file } => inspect(&file),
    }
}

fn run_node(role: Role, args: NodeArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(name) = args.name {
        GLOBAL_CONFIG.set_node_name(name);
    }
    if let Some(port) = args.port {
        GLOBAL_CONFIG.set_node_port(port);
    }

    // The snapshot location: an input file doubles as the output, otherwise
    // -o or the configured default
    let snapshot_file = args
        .file
        .clone()
        .or(args.output)
        .unwrap_or_else(|| GLOBAL_CONFIG.get_snapshot_file());
    GLOBAL_CONFIG.set_snapshot_file(snapshot_file.clone());

    // Load the ledger from file or synthesize a fresh genesis
    let ledger = match &args.file {
        Some(file) => Snapshot::load(file)?.into_ledger()?,
        None => Ledger::new()?,
    };

    let transport = Arc::new(UdpTransport::bind(GLOBAL_CONFIG.get_node_port())?);
    let mut node = Node::start(GLOBAL_CONFIG.get_node_name(), role, ledger, transport);
    info!("Starting {} as {} node", node.get_identifier(), role.name);

    // Establish connection: announce until some peer completes the handshake
    while !node.is_ready() {
        node.announce();
        thread::sleep(Duration::from_secs(1));
    }

    // Sync up with the other nodes before serving
    node.resolve_conflicts();
    while !node.is_synced() {
        thread::sleep(Duration::from_secs(1));
    }
    info!("{} is synced at height {}", node.get_identifier(), node.height());

    serve(&node, role)?;

    // Save the ledger on the way out
    node.stop();
    {
        let ledger = node.ledger();
        let guard = ledger
            .lock()
            .expect("Failed to acquire lock on ledger - this should never happen");
        Snapshot::of(&guard).save(&snapshot_file)?;
    }

    Ok(())
}

// The operator loop: miners mine on demand, everyone else can submit
// spend-chain transactions. EOF (Ctrl-D) shuts the node down cleanly.
fn serve(node: &Node, role: Role) -> Result<(), Box<dyn std::error::Error>> {
    if role.can_mine {
        println!("Type anything to mine a block, Ctrl-D to quit");
    } else {
        println!("send <recipient> <amount> <previous_hash>, Ctrl-D to quit");
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if role.can_mine {
            info!("{} is mining", node.get_identifier());
            node.mine()?;
        } else if let Some((recipient, amount, previous_hash)) = parse_send(line) {
            let tx = Transaction::new(node.get_identifier(), recipient, amount, previous_hash)?;
            node.submit_transaction(tx);
        } else {
            println!("usage: send <recipient> <amount> <previous_hash>");
        }
    }

    Ok(())
}

fn parse_send(line: &str) -> Option<(String, u64, String)> {
    let mut parts = line.split_whitespace();
    if parts.next()? != "send" {
        return None;
    }
    let recipient = parts.next()?.to_string();
    let amount = parts.next()?.parse().ok()?;
    let previous_hash = parts.next()?.to_string();
    if parts.next().is_some() {
        return None;
    }
    Some((recipient, amount, previous_hash))
}

fn inspect(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = Snapshot::load(file)?;

    for block in &snapshot.chain {
        let header = block.get_header();
        println!(
            "Block {:>4} | hash {} | proof {:>8} | {} transaction(s)",
            header.get_index(),
            header.hash()?,
            header.get_proof(),
            block.get_transaction_hashes().len()
        );
    }
    println!("{} block(s) total", snapshot.chain.len());

    Ok(())
}
