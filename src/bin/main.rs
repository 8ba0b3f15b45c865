use fat32_inspect::{
    DeviceSource, DirEntry, Fat32Volume, MountOptions, Resolution, Result, split_path,
};
use std::fs::File;
use std::process::ExitCode;

const USAGE: &str = "usage: fat32-inspect <device> <path> [--offset BYTES] [--chain] [--dump]

  <device>   image file, block device, or drive letter (J:) on Windows
  <path>     path inside the volume, '/' or '\\' separated; '/' lists the root
  --offset   byte offset of the volume inside <device>
  --chain    print the cluster chain and sector ranges of the entry
  --dump     hex dump the file contents";

const DUMP_LIMIT: usize = 4096;

struct Args {
    device: String,
    path: String,
    offset: u64,
    chain: bool,
    dump: bool,
}

fn parse_args() -> std::result::Result<Args, String> {
    let mut positional = Vec::new();
    let mut offset = 0;
    let mut chain = false;
    let mut dump = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--chain" => chain = true,
            "--dump" => dump = true,
            "--offset" => {
                let value = args.next().ok_or("--offset needs a value")?;
                offset = parse_offset(&value).ok_or(format!("bad offset '{}'", value))?;
            }
            "-h" | "--help" => return Err(String::new()),
            _ if arg.starts_with("--") => return Err(format!("unknown option '{}'", arg)),
            _ => positional.push(arg),
        }
    }

    if positional.len() != 2 {
        return Err("expected <device> and <path>".to_string());
    }
    let path = positional.pop().unwrap_or_default();
    let device = positional.pop().unwrap_or_default();
    Ok(Args {
        device,
        path,
        offset,
        chain,
        dump,
    })
}

fn parse_offset(value: &str) -> Option<u64> {
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let options = MountOptions {
        partition_offset: args.offset,
    };
    let mut volume = match Fat32Volume::open_with(&args.device, options) {
        Ok(volume) => volume,
        Err(e) => {
            eprintln!("cannot mount '{}': {}", args.device, e);
            return ExitCode::from(2);
        }
    };

    match run(&mut volume, &args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

type Volume = Fat32Volume<DeviceSource<File>>;

fn run(volume: &mut Volume, args: &Args) -> Result<bool> {
    print_geometry(volume);

    let components = split_path(&args.path);
    if components.is_empty() {
        println!("\n/:");
        print_dir(&volume.list_root()?);
        return Ok(true);
    }

    let entry = match volume.resolve(&components)? {
        Resolution::Found(entry) => entry,
        Resolution::NotFound { depth } => {
            println!("\nnot found: '{}'", components[..=depth].join("/"));
            return Ok(false);
        }
        Resolution::NotADirectory { depth, entry } => {
            println!(
                "\nnot a directory: '{}' ({} bytes)",
                components[..=depth].join("/"),
                entry.size
            );
            return Ok(false);
        }
    };

    println!();
    print_entry(&entry);

    if args.chain {
        print_chain(volume, &entry)?;
    }

    if entry.is_directory() {
        println!("\ncontents:");
        print_dir(&volume.list_directory(entry.first_cluster)?);
    } else if args.dump {
        print_dump(volume, &entry)?;
    }

    Ok(true)
}

fn print_geometry(volume: &Volume) {
    let g = volume.geometry();
    println!(
        "bytes/sector={}  sectors/cluster={}  reserved={}  fats={}  sectors/fat={}  root={}  total sectors={}",
        g.bytes_per_sector,
        g.sectors_per_cluster,
        g.reserved_sectors,
        g.num_fats,
        g.sectors_per_fat,
        g.root_cluster,
        g.total_sectors
    );
}

fn print_entry(entry: &DirEntry) {
    println!("name:        {}", entry.name);
    if entry.has_long_name {
        println!("short name:  {}", entry.short_name);
    }
    println!("attributes:  {} ({:#04x})", entry.attributes, entry.attributes.bits());
    println!("size:        {}", entry.size);
    println!("cluster:     {}", entry.first_cluster);
    println!("created:     {}", entry.created);
    println!("modified:    {}", entry.modified);
    println!("accessed:    {}", entry.accessed);
}

fn print_chain(volume: &mut Volume, entry: &DirEntry) -> Result<()> {
    let clusters: Vec<u32> = volume
        .cluster_chain(entry.first_cluster)
        .collect::<Result<_>>()?;
    println!("\ncluster chain ({} clusters):", clusters.len());
    for cluster in clusters {
        let (first, last) = volume.cluster_to_sectors(cluster)?;
        println!("  {:>10}  sectors {}-{}", cluster, first, last);
    }
    Ok(())
}

fn print_dump(volume: &mut Volume, entry: &DirEntry) -> Result<()> {
    println!();
    let mut offset = 0usize;
    for block in volume.read_file_contents(entry) {
        let block = block?;
        for line in block.chunks(16) {
            if offset >= DUMP_LIMIT {
                println!("... ({} bytes total)", entry.size);
                return Ok(());
            }
            let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
            let ascii: String = line
                .iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                .collect();
            println!("{:08x}  {:<47}  {}", offset, hex.join(" "), ascii);
            offset += line.len();
        }
    }
    Ok(())
}

fn print_dir(entries: &[DirEntry]) {
    if entries.is_empty() {
        println!("(empty)");
        return;
    }
    for e in entries.iter().filter(|e| !e.is_volume_label()) {
        let typ = if e.is_directory() { "<DIR>" } else { "     " };
        println!(
            "{:32} {}  {}  cluster={}  size={}",
            e.name, typ, e.attributes, e.first_cluster, e.size
        );
    }
}
