// CLI: vérifie et répare une image FAT12/16
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};

use fatcheck::{Options, Volume};

mod logging;

/// Image disque chargée en mémoire
struct ImageFile {
    path: PathBuf,
    buffer: Vec<u8>,
}

impl ImageFile {
    fn load(path: &Path) -> Result<Self> {
        let buffer = fs::read(path).with_context(|| format!("cannot read '{}'", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            buffer,
        })
    }

    fn persist(&self) -> Result<()> {
        fs::write(&self.path, &self.buffer)
            .with_context(|| format!("cannot write '{}'", self.path.display()))
    }
}

fn print_usage(program: &str) {
    eprintln!("usage: {} <imagename>", program);
}

fn run(path: &Path) -> Result<()> {
    let mut image = ImageFile::load(path)?;

    let report = {
        let mut volume = Volume::open(&mut image.buffer)
            .with_context(|| format!("'{}' is not a usable FAT12/16 image", path.display()))?;
        let geo = *volume.geometry();
        println!(
            "{}: {} clusters of {} bytes",
            geo.fat_type.name(),
            geo.cluster_count(),
            geo.cluster_size()
        );

        let options = Options::default();
        // l'arbre tel qu'il est sur le disque, avant réparation
        for line in fatcheck::list_tree(&mut volume, options.prune_at_empty)? {
            println!("{}", line);
        }
        fatcheck::check(&mut volume, &options)?
    };

    for finding in &report.findings {
        println!("{}", finding);
    }
    println!("{}", report);

    if report.is_modified() {
        image.persist()?;
        println!("image updated");
    }
    Ok(())
}

fn main() {
    logging::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(args.first().map_or("fatcheck", String::as_str));
        process::exit(1);
    }

    if let Err(e) = run(Path::new(&args[1])) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}
