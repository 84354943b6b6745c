use std::{env, path::PathBuf};

use anyhow::Context;
use plugmap::{Conversion, Field, Lookup, PlateList, Pointing, ScanMeta};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "create-plplugmapm",
    about = "Converts the plPlugMapP file of a plate into the plPlugMapM file of a guide field scan",
    after_help = "The plate list directory defaults to the PLATELIST_DIR environment variable"
)]
struct Opt {
    /// The plate id
    plate_id: u32,
    /// The pointing: A, B, C or D
    pointing: String,
    /// The field to map: 1, 2 or 3
    field: u32,
    /// The MJD of the scan
    mjd: u32,
    /// The lookup table linking fibers (1st column) and holes (2nd column)
    #[structopt(short, long, parse(from_os_str))]
    lookup_table: Option<PathBuf>,
    /// The fscanId to create
    #[structopt(short, long, default_value = "1")]
    fscan_id: u32,
    /// The cartridge id
    #[structopt(short, long, default_value = "20")]
    cartridge_id: u32,
    /// Path to the plate list repository
    #[structopt(long, parse(from_os_str))]
    platelist_dir: Option<PathBuf>,
    /// Directory the plPlugMapM file is written to
    #[structopt(short, long, parse(from_os_str), default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();
    log::debug!("{:?}", opt);

    let platelist_dir = match opt.platelist_dir {
        Some(dir) => dir,
        None => env::var("PLATELIST_DIR")
            .map(PathBuf::from)
            .context(r#""PLATELIST_DIR" is not set and --platelist-dir is missing"#)?,
    };
    let pointing = Pointing::new(&opt.pointing)?;
    let field = Field::new(opt.field)?;
    let lookup = Lookup::select(opt.lookup_table.as_ref())?;
    let meta = ScanMeta::new(opt.plate_id, opt.mjd)
        .fscan_id(opt.fscan_id)
        .cartridge_id(opt.cartridge_id);

    let path = Conversion::new(PlateList::new(platelist_dir), pointing, field, meta)
        .lookup(lookup)
        .output_dir(opt.output_dir)
        .run()
        .context("failed to create the plPlugMapM file")?;
    println!("{}", path.display());

    Ok(())
}
