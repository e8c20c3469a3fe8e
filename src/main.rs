#[macro_use]
extern crate anyhow;

use clap::{Arg, ArgMatches, Command};
use myfs::{mkfs, Geometry, ImageDevice, MyFs};
use std::{
    convert::TryFrom,
    io::{self, Read, Write},
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let image_arg = || Arg::new("image").required(true).help("Location of the file system image");
    let name_arg = || Arg::new("name").required(true).help("Name of the entry");

    let matches = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .subcommand_required(true)
        .subcommand(
            Command::new("mkfs")
                .about("Create a new filesystem image")
                .arg(image_arg())
                .arg(
                    Arg::new("inodes")
                        .short('n')
                        .long("inodes")
                        .takes_value(true)
                        .help("Number of inodes, which is also the maximum number of entries.")
                        .default_value("512"),
                )
                .arg(
                    Arg::new("slot-size")
                        .short('s')
                        .long("slot-size")
                        .takes_value(true)
                        .help("Capacity of each file, e.g. 512 or 4KiB.")
                        .default_value("512"),
                ),
        )
        .subcommand(
            Command::new("ls")
                .about("List the root directory")
                .arg(image_arg()),
        )
        .subcommand(
            Command::new("create")
                .about("Create an empty file or directory")
                .arg(image_arg())
                .arg(name_arg())
                .arg(
                    Arg::new("dir")
                        .short('d')
                        .long("dir")
                        .help("Create a directory entry"),
                ),
        )
        .subcommand(
            Command::new("cat")
                .about("Print the content of a file")
                .arg(image_arg())
                .arg(name_arg()),
        )
        .subcommand(
            Command::new("write")
                .about("Replace the content of a file")
                .arg(image_arg())
                .arg(name_arg())
                .arg(Arg::new("content").help("New content, read from stdin when omitted")),
        )
        .subcommand(
            Command::new("df")
                .about("Show inode and slot usage")
                .arg(image_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("mkfs", matches)) => {
            let image = value(matches, "image")?;
            let inode_count = value(matches, "inodes")?.parse::<u32>()?;
            let slot_size = match byte_unit::Byte::from_str(value(matches, "slot-size")?) {
                Ok(size) => size.get_bytes(),
                Err(err) => return Err(anyhow!(err)),
            };
            let slot_size = u32::try_from(slot_size)
                .map_err(|_| anyhow!("slot size {} does not fit in 32 bits", slot_size))?;

            let fs = mkfs::make(image, Geometry::new(inode_count, slot_size))?;
            println!(
                "{}: {} inodes, {} per file, {} total",
                image,
                inode_count,
                human(slot_size as u64),
                human(fs.geometry().device_size())
            );
        }
        Some(("ls", matches)) => {
            let fs = open(matches)?;
            for entry in fs.list_dir("/")? {
                let kind = if entry.is_directory { 'd' } else { '-' };
                println!("{} {:>8} {}", kind, entry.logical_size, entry.name);
            }
        }
        Some(("create", matches)) => {
            let mut fs = open(matches)?;
            fs.create_file(value(matches, "name")?, matches.is_present("dir"))?;
        }
        Some(("cat", matches)) => {
            let fs = open(matches)?;
            let content = fs.get_content(value(matches, "name")?)?;
            io::stdout().write_all(&content)?;
        }
        Some(("write", matches)) => {
            let content = match matches.value_of("content") {
                Some(content) => content.as_bytes().to_vec(),
                None => {
                    let mut buf = Vec::new();
                    io::stdin().read_to_end(&mut buf)?;
                    buf
                }
            };
            let mut fs = open(matches)?;
            fs.set_content(value(matches, "name")?, &content)?;
        }
        Some(("df", matches)) => {
            let stat = open(matches)?.statfs()?;
            println!(
                "inodes: {} used, {} free, {} total",
                stat.inode_count - stat.free_inodes,
                stat.free_inodes,
                stat.inode_count
            );
            println!("entries: {}", stat.entry_count);
            println!("slot size: {}", human(stat.slot_size as u64));
            println!("device size: {}", human(stat.device_size));
        }
        _ => unreachable!("clap requires a subcommand"),
    }

    Ok(())
}

fn open(matches: &ArgMatches) -> anyhow::Result<MyFs<ImageDevice>> {
    let device = ImageDevice::open(value(matches, "image")?)?;
    Ok(MyFs::mount(device, Geometry::default())?)
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| anyhow!("missing argument <{}>", name))
}

fn human(bytes: u64) -> String {
    byte_unit::Byte::from_bytes(bytes as _)
        .get_appropriate_unit(true)
        .to_string()
}
