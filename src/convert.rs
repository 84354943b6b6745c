//! plPlugMapP to plPlugMapM conversion
//!
//! [convert] derives the plPlugMapM content in memory, [Conversion] resolves
//! the source file of a plate in a plate list, converts it and writes the result.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use crate::{
    field::{Field, Pointing},
    header::{self, ScanMeta},
    lookup::Lookup,
    plugmap::{self, Hole, PlugMap},
    yanny::{self, EnumDef, ParFile, Table},
    Result,
};

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("plPlugMapP file {0:?} not found")]
    SourceNotFound(PathBuf),
    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A plate list repository
///
/// The plPlugMapP files are in `<root>/plates/<XXXX>XX/<XXXXXX>/`,
/// `XXXXXX` being the zero padded plate id
#[derive(Debug, Clone, PartialEq)]
pub struct PlateList {
    root: PathBuf,
}
impl PlateList {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
    /// Directory of the files of a plate
    pub fn plate_dir(&self, plate_id: u32) -> PathBuf {
        let padded = format!("{:06}", plate_id);
        self.root
            .join("plates")
            .join(format!("{}XX", &padded[..padded.len() - 2]))
            .join(padded)
    }
    /// Path to the plPlugMapP file of a plate pointing
    pub fn plug_map_p(&self, plate_id: u32, pointing: Pointing) -> PathBuf {
        self.plate_dir(plate_id)
            .join(format!("plPlugMapP-{}{}.par", plate_id, pointing.suffix()))
    }
}

/// Name of the plPlugMapM file of a field scan
pub fn output_file_name(meta: &ScanMeta, pointing: Pointing, field: Field) -> String {
    format!(
        "plPlugMapM-{}{}-{}-{:02}_{}.par",
        meta.plate_id,
        pointing.suffix(),
        meta.mjd,
        meta.fscan_id,
        field.colour()
    )
}

/// The content of a plPlugMapM file
#[derive(Debug, Clone)]
pub struct PlPlugMapM {
    pub file_name: String,
    pub header: Vec<String>,
    pub enums: Vec<EnumDef>,
    pub records: Vec<Hole>,
    pub table: Table,
}
impl PlPlugMapM {
    /// The file lines, the header follows the leading comment block
    pub fn to_lines(&self) -> Vec<String> {
        let lines = yanny::render(&self.enums, std::slice::from_ref(&self.table));
        yanny::splice_header(lines, &self.header)
    }
    /// Writes the file in `dir`
    ///
    /// The file is written to a temporary file in `dir` first and then renamed,
    /// an existing file is replaced only if the write succeeds
    pub fn write<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        let write_error = |source: io::Error| ConvertError::Write {
            path: path.clone(),
            source,
        };
        let mut file = tempfile::NamedTempFile::new_in(dir.as_ref()).map_err(write_error)?;
        for line in self.to_lines() {
            writeln!(file, "{}", line).map_err(write_error)?;
        }
        file.flush().map_err(write_error)?;
        file.persist(&path).map_err(|e| write_error(e.error))?;
        Ok(path)
    }
}

/// Converts a plPlugMapP file content to the plPlugMapM of a field scan
pub fn convert(
    par: &ParFile,
    pointing: Pointing,
    field: Field,
    meta: &ScanMeta,
    lookup: &Lookup,
) -> Result<PlPlugMapM> {
    let mut plug_map = PlugMap::from_par(par)?;
    let holes = std::mem::take(&mut plug_map.holes);
    let selection = plugmap::select_field_records(holes, pointing, field)?;
    log::info!(
        "fiber range {:?}: {} light traps, {} alignment holes, {} guides",
        selection.range,
        selection.light_traps.len(),
        selection.alignments.len(),
        selection.guides.len()
    );
    if !lookup.is_identity() {
        log::info!("guide fibers reassigned by the lookup table");
    }
    let records = selection.apply_permutation(lookup)?.into_records();
    let header = header::regenerate(&par.header, meta, field, pointing);
    Ok(PlPlugMapM {
        file_name: output_file_name(meta, pointing, field),
        header,
        enums: plug_map.enums().to_vec(),
        table: plug_map.to_table(&records),
        records,
    })
}

/// A plPlugMapM conversion job
#[derive(Debug, Clone)]
pub struct Conversion {
    pub plate_list: PlateList,
    pub pointing: Pointing,
    pub field: Field,
    pub meta: ScanMeta,
    pub lookup: Lookup,
    pub output_dir: PathBuf,
}
impl Conversion {
    pub fn new(plate_list: PlateList, pointing: Pointing, field: Field, meta: ScanMeta) -> Self {
        Self {
            plate_list,
            pointing,
            field,
            meta,
            lookup: Lookup::identity(),
            output_dir: PathBuf::from("."),
        }
    }
    pub fn lookup(self, lookup: Lookup) -> Self {
        Self { lookup, ..self }
    }
    pub fn output_dir<P: Into<PathBuf>>(self, output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..self
        }
    }
    /// Path to the plPlugMapP source file
    pub fn source(&self) -> PathBuf {
        self.plate_list
            .plug_map_p(self.meta.plate_id, self.pointing)
    }
    /// Reads the plPlugMapP source file and derives the plPlugMapM content
    pub fn derive(&self) -> Result<PlPlugMapM> {
        let source = self.source();
        if !source.is_file() {
            return Err(ConvertError::SourceNotFound(source).into());
        }
        log::info!("Loading {:?}...", source);
        let now = Instant::now();
        let par = ParFile::read(&source)?;
        let plug_map_m = convert(&par, self.pointing, self.field, &self.meta, &self.lookup)?;
        log::info!("... converted in {}ms", now.elapsed().as_millis());
        Ok(plug_map_m)
    }
    /// Converts the source file and writes the plPlugMapM file in the output directory
    pub fn run(&self) -> Result<PathBuf> {
        let plug_map_m = self.derive()?;
        let path = plug_map_m.write(&self.output_dir)?;
        log::info!(
            "{} records written to {:?}",
            plug_map_m.records.len(),
            path
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugmap::PlugMapError;

    #[test]
    fn plate_paths() {
        let plate_list = PlateList::new("/platelist");
        assert_eq!(
            plate_list.plug_map_p(8123, Pointing::B),
            Path::new("/platelist/plates/0081XX/008123/plPlugMapP-8123B.par")
        );
        assert_eq!(
            plate_list.plug_map_p(8123, Pointing::A),
            Path::new("/platelist/plates/0081XX/008123/plPlugMapP-8123.par")
        );
        assert_eq!(
            plate_list.plate_dir(12),
            Path::new("/platelist/plates/0000XX/000012")
        );
        assert_eq!(
            plate_list.plate_dir(1234567),
            Path::new("/platelist/plates/12345XX/1234567")
        );
    }

    #[test]
    fn output_names() {
        let meta = ScanMeta::new(8123, 57514).fscan_id(2);
        assert_eq!(
            output_file_name(&meta, Pointing::A, Field::One),
            "plPlugMapM-8123-57514-02_GREEN.par"
        );
        assert_eq!(
            output_file_name(&meta, Pointing::C, Field::Three),
            "plPlugMapM-8123C-57514-02_VIOLET.par"
        );
        assert_eq!(
            output_file_name(&meta, Pointing::C, Field::Three),
            output_file_name(&meta.clone(), Pointing::C, Field::Three)
        );
    }

    #[test]
    fn missing_source() {
        let conversion = Conversion::new(
            PlateList::new("does/not/exist"),
            Pointing::A,
            Field::One,
            ScanMeta::new(8123, 57514),
        );
        assert!(matches!(
            conversion.derive(),
            Err(crate::Error::Convert(ConvertError::SourceNotFound(_)))
        ));
    }

    const ENUMS: &str = "typedef enum {
  OBJECT,
  COHERENT_SKY,
  GUIDE,
  LIGHT_TRAP,
  ALIGNMENT
} HOLETYPE;

typedef enum {
  NA,
  SKY,
  STAR_BHB
} OBJTYPE;

typedef struct {
  int objId[5];
  HOLETYPE holeType;
  double ra;
  double dec;
  float mag[5];
  char name[16];
  OBJTYPE objType;
  double xFocal;
  double yFocal;
  int fiberId;
} PLUGMAPOBJ;
";

    /// A pointing B plPlugMapP file, `xFocal` is the fiber id of each hole
    fn plate_file(skip_guide: Option<i64>) -> String {
        let mut text = String::from(
            "# plPlugMapP-8123B.par\n# guider commissioning plate\nplateId 8123\nguidenums1 1 2 3\nguidenums2 49 50 51\n\n",
        );
        text.push_str(ENUMS);
        text.push('\n');
        let row = |hole_type: &str, obj_type: &str, fiber_id: i64| {
            format!(
                "PLUGMAPOBJ {{ 0 0 0 0 {} }} {} 150.1 2.2 {{ 17 17 17 17 17 }} \"hole {}\" {} {}.0 {}.5 {}\n",
                fiber_id, hole_type, fiber_id, obj_type, fiber_id, fiber_id, fiber_id
            )
        };
        for _ in 0..3 {
            text.push_str(&row("LIGHT_TRAP", "NA", -1));
        }
        text.push_str(&row("OBJECT", "SKY", -1));
        for fiber_id in 49..=96 {
            text.push_str(&row("ALIGNMENT", "NA", fiber_id));
        }
        for fiber_id in (49..=96).filter(|&f| Some(f) != skip_guide) {
            text.push_str(&row("GUIDE", "STAR_BHB", fiber_id));
        }
        text
    }

    fn plate_list(text: &str) -> (tempfile::TempDir, PlateList) {
        let dir = tempfile::tempdir().unwrap();
        let plate_list = PlateList::new(dir.path());
        let source = plate_list.plug_map_p(8123, Pointing::B);
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, text).unwrap();
        (dir, plate_list)
    }

    fn reversed() -> Lookup {
        (1..=16)
            .map(|i| format!("{} {}\n", i, 17 - i))
            .collect::<String>()
            .parse()
            .unwrap()
    }

    #[test]
    fn convert_second_field() {
        let (dir, plate_list) = plate_list(&plate_file(None));
        let meta = ScanMeta::new(8123, 57514);
        let conversion = Conversion::new(plate_list, Pointing::B, Field::Two, meta)
            .lookup(reversed())
            .output_dir(dir.path());
        let path = conversion.run().unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "plPlugMapM-8123B-57514-01_BLUE.par"
        );

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[..3].iter().all(|line| line.starts_with('#')));
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "# plPlugMapP-8123B.par");
        assert!(lines.contains(&"guidenums1 1 2 3"));
        assert!(lines.contains(&"guidenums2 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16"));
        assert!(lines.contains(&"fieldColour  BLUE"));
        assert!(lines.contains(&"fieldNumber  2"));

        let par = ParFile::read(&path).unwrap();
        assert_eq!(par.pair("cartridgeId"), Some("20"));
        assert_eq!(
            par.enumeration("HOLETYPE").unwrap().values,
            vec!["OBJECT", "COHERENT_SKY", "GUIDE", "LIGHT_TRAP", "ALIGNMENT"]
        );
        let plug_map = PlugMap::from_par(&par).unwrap();
        assert_eq!(plug_map.holes.len(), 3 + 16 + 16);
        let kinds: Vec<_> = plug_map.holes.iter().map(|h| h.kind).collect();
        assert!(kinds[..3].iter().all(|&k| k == plugmap::HoleKind::LightTrap));
        assert!(kinds[3..19].iter().all(|&k| k == plugmap::HoleKind::Alignment));
        assert!(kinds[19..].iter().all(|&k| k == plugmap::HoleKind::Guide));
        // alignment holes keep their plate fiber ids
        let alignments: Vec<_> = plug_map.holes[3..19].iter().map(|h| h.fiber_id).collect();
        assert_eq!(alignments, (65..=80).collect::<Vec<i64>>());
        // guide i takes fiber i from hole 17 - i
        for (i, guide) in plug_map.holes[19..].iter().enumerate() {
            assert_eq!(guide.fiber_id, i as i64 + 1);
            let x_focal = guide.row().0[7].as_scalar().unwrap();
            assert_eq!(x_focal, format!("{}.0", 64 + 16 - i));
            assert_eq!(guide.row().0[5].as_scalar().unwrap(), format!("hole {}", 64 + 16 - i));
        }
    }

    #[test]
    fn unsorted_guides_keep_source_order() {
        let mut lines: Vec<String> = plate_file(None).lines().map(String::from).collect();
        let first_guide = lines
            .iter()
            .position(|line| line.contains(" GUIDE "))
            .unwrap();
        lines[first_guide..].reverse();
        let (dir, plate_list) = plate_list(&(lines.join("\n") + "\n"));
        let conversion = Conversion::new(
            plate_list,
            Pointing::B,
            Field::Two,
            ScanMeta::new(8123, 57514),
        );
        let par = ParFile::read(conversion.source()).unwrap();
        let identity = convert(
            &par,
            Pointing::B,
            Field::Two,
            &conversion.meta,
            &Lookup::identity(),
        )
        .unwrap();
        // source order of the field guides is 80, 79, ..., 65
        for (i, guide) in identity.records[19..].iter().enumerate() {
            assert_eq!(guide.fiber_id, i as i64 + 1);
            assert_eq!(guide.row().0[7].as_scalar().unwrap(), format!("{}.0", 80 - i));
        }
        let path = conversion
            .lookup(reversed())
            .output_dir(dir.path())
            .run()
            .unwrap();
        let plug_map = PlugMap::from_par(&ParFile::read(&path).unwrap()).unwrap();
        for (i, guide) in plug_map.holes[19..].iter().enumerate() {
            assert_eq!(guide.fiber_id, i as i64 + 1);
            assert_eq!(guide.row().0[7].as_scalar().unwrap(), format!("{}.0", 65 + i));
        }
    }

    #[test]
    fn conversion_is_idempotent() {
        let (dir, plate_list) = plate_list(&plate_file(None));
        let meta = ScanMeta::new(8123, 57514).fscan_id(4);
        let conversion =
            Conversion::new(plate_list, Pointing::B, Field::Three, meta).output_dir(dir.path());
        let first = conversion.run().unwrap();
        let first_text = std::fs::read_to_string(&first).unwrap();
        let second = conversion.run().unwrap();
        assert_eq!(first, second);
        assert_eq!(first_text, std::fs::read_to_string(&second).unwrap());
    }

    #[test]
    fn failed_conversion_writes_nothing() {
        let (dir, plate_list) = plate_list(&plate_file(Some(70)));
        let out = tempfile::tempdir().unwrap();
        let meta = ScanMeta::new(8123, 57514);
        let conversion =
            Conversion::new(plate_list, Pointing::B, Field::Two, meta).output_dir(out.path());
        assert!(matches!(
            conversion.run(),
            Err(crate::Error::PlugMap(PlugMapError::FieldRange { found: 15, .. }))
        ));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
        // the other fields of the pointing are still complete
        let conversion = Conversion::new(
            PlateList::new(dir.path()),
            Pointing::B,
            Field::One,
            ScanMeta::new(8123, 57514),
        )
        .output_dir(out.path());
        assert!(conversion.run().is_ok());
    }
}
