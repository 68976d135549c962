use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::Error;



/// The `.su` file a record was read from.
pub type Origin = PathBuf;

/// Per function, every `(origin, bytes)` pair seen, in reading order.
pub type OriginCosts = BTreeMap<String, Vec<(Origin, u64)>>;

/// Suffix of the files GCC writes for `-fstack-usage`.
pub const SU_SUFFIX: &str = ".su";


/// A record whose qualifier is not `static`, e.g. `dynamic` or
/// `dynamic,bounded`. Its byte count is not an exact frame size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicRecord
{
    pub name:      String,
    pub bytes:     u64,
    pub qualifier: String,
    pub origin:    Origin,
}









/*      ███████╗ ██████╗ █████╗ ███╗   ██╗      */
/*      ██╔════╝██╔════╝██╔══██╗████╗  ██║      */
/*      ███████╗██║     ███████║██╔██╗ ██║      */
/*      ╚════██║██║     ██╔══██║██║╚██╗██║      */
/*      ███████║╚██████╗██║  ██║██║ ╚████║      */
/*      ╚══════╝ ╚═════╝╚═╝  ╚═╝╚═╝  ╚═══╝      */
/*     ███████████████████████████████████╗     */
/*     ╚══════════════════════════════════╝     */

///
/// Stack-usage records gathered from a tree of `.su` files.
///
/// Each line reads `<file>:<line>:<column>:<function> <bytes> <qualifier>`.
/// Only `static` records give exact frame sizes and feed `origins` and
/// `best`; the others are set aside in `dynamic`.
///
#[derive(Clone, Debug, Default)]
pub struct StackUsage
{
    pub origins: OriginCosts,
    /// Largest static byte count seen for a name across all origins.
    pub best:    BTreeMap<String, u64>,
    pub dynamic: Vec<DynamicRecord>,
}

impl StackUsage
{
    pub fn new() -> Self
    {
        StackUsage::default()
    }

    /// Recursively reads every file under `root` whose name ends in `suffix`.
    pub fn scan_dir(root: &Path, suffix: &str) -> Result<Self, Error>
    {
        let mut su = StackUsage::new();
        let mut files = 0usize;

        for entry in WalkDir::new(root).sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file()
            {
                continue;
            }

            let matches = entry.file_name()
                .to_str()
                .map_or(false, |name| name.ends_with(suffix));
            if matches
            {
                su.read_file(entry.path())?;
                files += 1;
            }
        }

        debug!(
            "read {} stack usage files: {} functions, {} ambiguous",
            files,
            su.best.len(),
            su.ambiguous().count()
        );
        if !su.dynamic.is_empty()
        {
            warn!(
                "{} functions have dynamic stack usage and are not counted; the debug log lists them",
                su.dynamic.len()
            );
        }
        Ok(su)
    }

    pub fn read_file(&mut self, path: &Path) -> Result<(), Error>
    {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        self.parse(path, &String::from_utf8_lossy(&bytes));
        Ok(())
    }

    /// Parses the contents of one `.su` file; malformed lines are skipped.
    pub fn parse(&mut self, origin: &Path, text: &str)
    {
        for line in text.lines()
        {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let &[qualified, bytes, qualifier] = fields.as_slice()
            else
            {
                continue;
            };

            let name = qualified.rsplit(':').next().unwrap_or(qualified);
            let Ok(bytes) = bytes.parse::<u64>()
            else
            {
                continue;
            };

            if qualifier == "static"
            {
                trace!("{}: `{}` uses {} bytes", origin.display(), name, bytes);
                self.add(origin, name, bytes);
            }
            else
            {
                debug!(
                    "{}: `{}` has {} stack usage ({} bytes); not used as a frame size",
                    origin.display(),
                    name,
                    qualifier,
                    bytes
                );
                self.dynamic.push(DynamicRecord
                {
                    name:      name.to_string(),
                    bytes,
                    qualifier: qualifier.to_string(),
                    origin:    origin.to_path_buf(),
                });
            }
        }
    }

    pub fn add(&mut self, origin: &Path, name: &str, bytes: u64)
    {
        self.origins
            .entry(name.to_string())
            .or_default()
            .push((origin.to_path_buf(), bytes));

        let best = self.best.entry(name.to_string()).or_insert(0);
        *best = (*best).max(bytes);
    }

    /// Names defined in more than one origin (file-local duplicates).
    pub fn ambiguous(&self) -> impl Iterator<Item = &str>
    {
        self.origins
            .iter()
            .filter(|(_, list)|
            {
                list.iter().skip(1).any(|(origin, _)| *origin != list[0].0)
            })
            .map(|(name, _)| name.as_str())
    }
}


#[cfg(test)]
mod tests
{
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn static_records_feed_both_tables()
    {
        let mut su = StackUsage::new();
        su.parse(Path::new("a.su"), "main.c:10:5:main\t48\tstatic\nmain.c:20:13:helper\t16\tstatic\n");

        assert_eq!(su.best.get("main"), Some(&48));
        assert_eq!(su.origins["helper"], vec![(PathBuf::from("a.su"), 16)]);
        assert!(su.dynamic.is_empty());
    }

    #[test]
    fn best_keeps_the_largest_count_across_origins()
    {
        let mut su = StackUsage::new();
        su.parse(Path::new("a.su"), "a.c:3:12:func\t24\tstatic\n");
        su.parse(Path::new("b.su"), "b.c:7:12:func\t72\tstatic\n");
        su.parse(Path::new("c.su"), "c.c:1:12:func\t8\tstatic\n");

        assert_eq!(su.best.get("func"), Some(&72));
        assert_eq!(su.origins["func"].len(), 3);
        assert_eq!(su.ambiguous().collect::<Vec<_>>(), vec!["func"]);
    }

    #[test]
    fn dynamic_records_are_set_aside()
    {
        let mut su = StackUsage::new();
        su.parse(
            Path::new("a.su"),
            "a.c:3:6:vla\t32\tdynamic\na.c:9:6:alloca_user\t64\tdynamic,bounded\n",
        );

        assert!(su.best.is_empty());
        assert_eq!(su.dynamic.len(), 2);
        assert_eq!(su.dynamic[1].name, "alloca_user");
        assert_eq!(su.dynamic[1].qualifier, "dynamic,bounded");
    }

    #[test]
    fn malformed_lines_are_skipped()
    {
        let mut su = StackUsage::new();
        su.parse(
            Path::new("a.su"),
            "garbage\na.c:1:1:f\tlots\tstatic\na.c:1:1:g\t-4\tstatic\n\
             a.cpp:4:5:int h(int)\t16\tstatic\na.c:2:2:ok\t8\tstatic\n",
        );

        assert_eq!(su.best.keys().collect::<Vec<_>>(), vec!["ok"]);
    }

    #[test]
    fn scanning_finds_nested_files_with_the_suffix()
    {
        let root = tempdir().unwrap();
        let nested = root.path().join("build").join("drivers");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.path().join("main.su"), "main.c:5:5:main\t32\tstatic\n").unwrap();
        fs::write(nested.join("uart.su"), "uart.c:9:6:uart_send\t16\tstatic\nuart.c:30:6:drain\t48\tdynamic\n").unwrap();
        fs::write(nested.join("uart.o"), "uart.c:9:6:not_read\t99\tstatic\n").unwrap();

        let su = StackUsage::scan_dir(root.path(), SU_SUFFIX).unwrap();

        assert_eq!(su.best.keys().collect::<Vec<_>>(), vec!["main", "uart_send"]);
        assert_eq!(su.origins["uart_send"][0].0, nested.join("uart.su"));
        assert_eq!(su.dynamic.len(), 1);
        assert_eq!(su.dynamic[0].origin, nested.join("uart.su"));
    }

    #[test]
    fn scanning_a_missing_directory_fails()
    {
        let root = tempdir().unwrap();
        let missing = root.path().join("never-built");
        assert!(matches!(StackUsage::scan_dir(&missing, SU_SUFFIX), Err(Error::Walk(_))));
    }
}
