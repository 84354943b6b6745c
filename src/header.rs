//! plPlugMapM header regeneration

use itertools::Itertools;

use crate::{
    field::{Field, Pointing},
    N_GUIDES,
};

pub const FSCAN_VERSION: &str =
    "$HeadURL: https://svn.sdss.org/repo/operations/general/idlmapper/v6_0_7/src/evilscan.c $";
pub const FSCAN_DATE: &str = "Fri May  6 12:00:00 2016";
pub const DEFAULT_CARTRIDGE_ID: u32 = 20;
pub const DEFAULT_PLUGGERS: &str = "Jose";

/// Fiber scan metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ScanMeta {
    pub plate_id: u32,
    pub mjd: u32,
    pub fscan_id: u32,
    pub cartridge_id: u32,
    pub pluggers: String,
}
impl ScanMeta {
    /// Metadata of the first scan of `plate_id` on `mjd`
    pub fn new(plate_id: u32, mjd: u32) -> Self {
        Self {
            plate_id,
            mjd,
            fscan_id: 1,
            cartridge_id: DEFAULT_CARTRIDGE_ID,
            pluggers: DEFAULT_PLUGGERS.to_string(),
        }
    }
    pub fn fscan_id(self, fscan_id: u32) -> Self {
        Self { fscan_id, ..self }
    }
    pub fn cartridge_id(self, cartridge_id: u32) -> Self {
        Self {
            cartridge_id,
            ..self
        }
    }
    pub fn pluggers<S: Into<String>>(self, pluggers: S) -> Self {
        Self {
            pluggers: pluggers.into(),
            ..self
        }
    }
    /// Name of the fiber scan image file
    pub fn fscan_file(&self) -> String {
        format!(
            "fiberScan-{}-{}-{:02}.par",
            self.plate_id, self.mjd, self.fscan_id
        )
    }
    /// The `EVILSCAN` keywords block of a field scan
    pub fn keywords(&self, field: Field) -> Vec<String> {
        vec![
            "EVILSCAN".to_string(),
            format!("fscanVersion {}", FSCAN_VERSION),
            format!("pluggers     {}", self.pluggers),
            format!("plateId      {}", self.plate_id),
            format!("fscanMJD     {}", self.mjd),
            format!("fscanId      {}", self.fscan_id),
            format!("fscanDate    {}", FSCAN_DATE),
            format!("fscanFile    {}", self.fscan_file()),
            "fscanMode    interpolated".to_string(),
            "fscanSpeed   400".to_string(),
            "fscanRows    960".to_string(),
            "fscanCols    960".to_string(),
            "fscanBias    45.000000".to_string(),
            "motorId1     35".to_string(),
            "motorId2     31".to_string(),
            "motorId3     3".to_string(),
            format!("cartridgeId  {}", self.cartridge_id),
            format!("fieldNumber  {}", field.number()),
            format!("fieldColour  {}", field.colour()),
            "fmapVersion NOCVS:v6_0_7".to_string(),
            "idlutilsVersion v5_5_17".to_string(),
            "idlVersion 7.1".to_string(),
        ]
    }
}

/// The `guidenums<n>` keyword of a pointing listing every guide slot
pub fn guidenums(pointing: Pointing) -> String {
    format!(
        "guidenums{} {}",
        pointing.index() + 1,
        (1..=N_GUIDES).join(" ")
    )
}

/// Regenerates the header of a plPlugMapM file
///
/// The header is the source header with its `guidenums<n>` line of the pointing
/// rewritten, followed by the scan keywords, each block preceded by a blank line
/// and the whole header ending with one.
/// A `guidenums<n>` line continued with `\` is replaced with its continuation lines.
/// If the source header has no `guidenums<n>` line for the pointing, none is added.
pub fn regenerate(
    source: &[String],
    meta: &ScanMeta,
    field: Field,
    pointing: Pointing,
) -> Vec<String> {
    let prefix = format!("guidenums{}", pointing.index() + 1);
    let mut source = source.to_vec();
    match source.iter().position(|line| line.starts_with(&prefix)) {
        Some(i) => {
            let continued = source[i..]
                .iter()
                .take_while(|line| line.trim_end().ends_with('\\'))
                .count();
            let end = (i + continued).min(source.len() - 1);
            source[i] = guidenums(pointing);
            source.drain(i + 1..=end);
        }
        None => log::warn!("no {} line in the source header", prefix),
    }
    let mut header = Vec::with_capacity(source.len() + 25);
    header.push(String::new());
    header.extend(source);
    header.push(String::new());
    header.extend(meta.keywords(field));
    header.push(String::new());
    header
}
