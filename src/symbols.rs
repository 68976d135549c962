use std::collections::{BTreeMap, HashMap};

use log::debug;



/// How far a symbol extends past its start offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extent
{
    Bytes(u64),
    /// The highest symbol of the text section; nothing follows it to bound it.
    Unbounded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolInfo
{
    pub offset: u64,
    pub size:   Extent,
}

impl SymbolInfo
{
    /// `true` unless `offset` lies at or past the end of the symbol.
    ///
    /// Offsets below the start are treated as inside: a file-local symbol
    /// may be listed at several places while the table only keeps one.
    pub fn contains(&self, offset: u64) -> bool
    {
        match (offset.checked_sub(self.offset), self.size)
        {
            (None, _)                        => true,
            (Some(_), Extent::Unbounded)     => true,
            (Some(delta), Extent::Bytes(n))  => delta < n,
        }
    }
}


///
/// Code-section symbols of the binary with their offsets and sizes.
///
/// Sizes are derived, not read: each symbol reaches up to the next symbol
/// in offset order.
///
#[derive(Clone, Debug, Default)]
pub struct SymbolTable
{
    symbols: BTreeMap<String, SymbolInfo>,
}

impl SymbolTable
{
    /// Reads `nm` output, keeping only `T`/`t` (text section) symbols.
    pub fn parse_nm(text: &str) -> Self
    {
        let mut offsets: HashMap<String, u64> = HashMap::new();

        for line in text.lines()
        {
            let mut parts = line.split_whitespace();
            let (Some(offset), Some(kind), Some(name), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else
            {
                continue;
            };

            if kind != "T" && kind != "t"
            {
                continue;
            }

            if let Ok(offset) = u64::from_str_radix(offset, 16)
            {
                // file-local functions can share a name; the last one listed wins
                offsets.insert(name.to_string(), offset);
            }
        }

        SymbolTable::from_offsets(offsets)
    }

    pub fn from_offsets<S, I>(offsets: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, u64)>,
    {
        let mut sorted: Vec<(String, u64)> = offsets
            .into_iter()
            .map(|(name, offset)| (name.into(), offset))
            .collect();
        sorted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut symbols = BTreeMap::new();
        let mut iter = sorted.into_iter().peekable();
        while let Some((name, offset)) = iter.next()
        {
            let size = match iter.peek()
            {
                Some((_, next)) => Extent::Bytes(next - offset),
                None            => Extent::Unbounded,
            };
            symbols.insert(name, SymbolInfo { offset, size });
        }

        debug!("{} text symbols", symbols.len());
        SymbolTable { symbols }
    }

    pub fn get(&self, name: &str) -> Option<SymbolInfo>
    {
        self.symbols.get(name).copied()
    }

    pub fn len(&self) -> usize
    {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.symbols.is_empty()
    }
}


#[cfg(test)]
mod tests
{
    use super::*;

    const NM: &str = "\
08048400 T main
080483c0 t helper
08048380 T _start
0804a020 D some_data
         U printf
08048460 T last_one
";

    #[test]
    fn sizes_run_up_to_the_next_symbol()
    {
        let table = SymbolTable::parse_nm(NM);

        assert_eq!(table.len(), 4);
        assert_eq!(
            table.get("_start"),
            Some(SymbolInfo { offset: 0x08048380, size: Extent::Bytes(0x40) })
        );
        assert_eq!(table.get("helper").map(|s| s.size), Some(Extent::Bytes(0x40)));
        assert_eq!(table.get("main").map(|s| s.size), Some(Extent::Bytes(0x60)));
        assert_eq!(table.get("last_one").map(|s| s.size), Some(Extent::Unbounded));
    }

    #[test]
    fn non_text_and_undefined_symbols_are_dropped()
    {
        let table = SymbolTable::parse_nm(NM);

        assert!(table.get("some_data").is_none());
        assert!(table.get("printf").is_none());
    }

    #[test]
    fn duplicate_names_keep_the_last_offset()
    {
        let table = SymbolTable::parse_nm("00001000 t func\n00001010 T other\n00002000 t func\n");

        assert_eq!(table.get("func").map(|s| s.offset), Some(0x2000));
        assert_eq!(table.get("other").map(|s| s.size), Some(Extent::Bytes(0xff0)));
    }

    #[test]
    fn contains_checks_only_the_upper_bound()
    {
        let sym = SymbolInfo { offset: 0x100, size: Extent::Bytes(0x10) };

        assert!(sym.contains(0x100));
        assert!(sym.contains(0x10f));
        assert!(!sym.contains(0x110));
        assert!(sym.contains(0x80));
        assert!(SymbolInfo { offset: 0, size: Extent::Unbounded }.contains(u64::MAX));
    }

    #[test]
    fn empty_input_gives_an_empty_table()
    {
        assert!(SymbolTable::parse_nm("").is_empty());
    }
}
