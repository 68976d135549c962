use xmas_elf::{
    header::{Class, Data, Machine},
    ElfFile,
};

use crate::error::Error;









/*      ██╗███████╗ █████╗       */
/*      ██║██╔════╝██╔══██╗      */
/*      ██║███████╗███████║      */
/*      ██║╚════██║██╔══██║      */
/*      ██║███████║██║  ██║      */
/*      ╚═╝╚══════╝╚═╝  ╚═╝      */
/*     ████████████████████╗     */
/*     ╚═══════════════════╝     */

/// Instruction-set family of the analyzed binary.
///
/// Picks the objdump line shapes recognised as function labels, calls and
/// stack adjustments. Chosen once, before any input is read.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Isa
{
    /// 32-bit little-endian 80386
    X86,
    /// 64-bit little-endian x86-64
    X86_64,
    /// Big-endian, register-windowed (SPARC/LEON). `cross` is set when the
    /// family was forced by a cross-toolchain prefix rather than detected.
    Sparc { cross: bool },
    /// 32-bit little-endian ARM
    Arm,
}

impl Isa
{
    /// The family assumed whenever a cross-toolchain prefix is given.
    pub fn cross() -> Self
    {
        Isa::Sparc { cross: true }
    }

    /// Looks at the ELF header (class, data encoding, machine).
    pub fn detect(elf: &[u8]) -> Result<Isa, Error>
    {
        let elf = ElfFile::new(elf).map_err(|s| Error::NotElf(s.to_string()))?;
        let class = elf.header.pt1.class();
        let data = elf.header.pt1.data();
        let machine = elf.header.pt2.machine().as_machine();

        Isa::from_signature(class, data, machine).ok_or_else(||
            Error::UnknownArchitecture(format!("{:?} {:?} {:?}", class, data, machine)))
    }

    pub fn from_signature(class: Class, data: Data, machine: Machine) -> Option<Isa>
    {
        match (class, data, machine)
        {
            (Class::ThirtyTwo, Data::LittleEndian, Machine::X86)    => Some(Isa::X86),
            (Class::SixtyFour, Data::LittleEndian, Machine::X86_64) => Some(Isa::X86_64),
            (Class::ThirtyTwo, Data::BigEndian,    Machine::Sparc)  => Some(Isa::Sparc { cross: false }),
            (Class::ThirtyTwo, Data::LittleEndian, Machine::Arm)    => Some(Isa::Arm),
            _                                                        => None,
        }
    }

    /// Prefix of the binutils that understand this family.
    pub fn default_prefix(&self) -> &'static str
    {
        match *self
        {
            Isa::X86 | Isa::X86_64 => "",
            Isa::Sparc { .. }      => "sparc-rtems5-",
            Isa::Arm               => "arm-none-eabi-",
        }
    }

    fn is_symbol_char(&self, c: char) -> bool
    {
        c.is_ascii_alphanumeric()
            || c == '_'
            || (c == '.' && *self == Isa::Sparc { cross: true })
    }

    fn is_symbol(&self, name: &str) -> bool
    {
        !name.is_empty() && name.chars().all(|c| self.is_symbol_char(c))
    }

    fn call_mnemonics(&self) -> &'static [&'static str]
    {
        match *self
        {
            Isa::X86          => &["call"],
            Isa::X86_64       => &["call", "callq"],
            Isa::Sparc { .. } => &["call"],
            Isa::Arm          => &["bl"],
        }
    }

    ///
    /// `08048be8 <name>:` starts a function.
    ///
    /// Returns the label's offset and the function name.
    ///
    pub fn function_label<'l>(&self, line: &'l str) -> Option<(u64, &'l str)>
    {
        let (offset, rest) = line.split_once(" <")?;
        if offset.is_empty() || offset.contains(char::is_whitespace)
        {
            return None;
        }

        let name = &rest[..rest.find(">:")?];
        if !self.is_symbol(name)
        {
            return None;
        }

        let offset = u64::from_str_radix(offset, 16).ok()?;
        Some((offset, name))
    }

    /// ` 8048bec:` (any indentation) gives the offset of an instruction.
    pub fn instruction_offset(&self, line: &str) -> Option<u64>
    {
        let (offset, _) = line.trim_start().split_once(':')?;
        if offset.is_empty() || !offset.chars().all(|c| c.is_ascii_hexdigit())
        {
            return None;
        }
        u64::from_str_radix(offset, 16).ok()
    }

    ///
    /// Name of the target of a direct call, e.g. `frame_dummy` in
    ///
    /// ` 8048c0a:  e8 a1 03 00 00   call   8048fb0 <frame_dummy>`
    ///
    /// Indirect calls carry no `<symbol>` operand and are never matched.
    ///
    pub fn call_target<'l>(&self, line: &'l str) -> Option<&'l str>
    {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let mnemonics = self.call_mnemonics();

        tokens.windows(3)
            .filter(|w| mnemonics.contains(&w[0]))
            .find_map(|w|
            {
                let target = w[2].strip_prefix('<')?;
                let name = &target[..target.find('>')?];
                if self.is_symbol(name) { Some(name) } else { None }
            })
    }

    ///
    /// Bytes reserved by a stack-adjustment instruction, normalised to a
    /// positive count.
    ///
    /// - x86: `sub $0x46,%esp`, and `add $0xffffff80,%esp` (two's complement)
    /// - x86-64: the same against `%rsp`
    /// - SPARC: `save %sp, -104, %sp`
    /// - ARM: `sub sp, sp, #1024`
    ///
    pub fn stack_adjustment(&self, line: &str) -> Option<u64>
    {
        match *self
        {
            Isa::X86             => x86_adjustment(line, "%esp"),
            Isa::X86_64          => x86_adjustment(line, "%rsp"),
            Isa::Sparc { cross } => sparc_save(line, cross),
            Isa::Arm             => arm_sub(line),
        }
    }
}


fn x86_adjustment(line: &str, sp: &str) -> Option<u64>
{
    let tokens: Vec<&str> = line.split_whitespace().collect();

    tokens.windows(2)
        .filter(|w| w[0] == "add" || w[0] == "sub")
        .find_map(|w|
        {
            let (value, register) = w[1].strip_prefix("$0x")?.split_once(',')?;
            if register != sp
            {
                return None;
            }
            u64::from_str_radix(value, 16).ok().map(negate_twos_complement)
        })
}

// GCC may encode `sub $0x80,%esp` as `add $0xffffff80,%esp`
fn negate_twos_complement(value: u64) -> u64
{
    if value <= i32::MAX as u64
    {
        value
    }
    else if value <= u32::MAX as u64
    {
        (1u64 << 32) - value
    }
    else
    {
        value.wrapping_neg()
    }
}

fn sparc_save(line: &str, cross: bool) -> Option<u64>
{
    let rest = &line[line.find("save")? + "save".len()..];

    rest.rmatch_indices("%sp, -")
        .find_map(|(i, pat)|
        {
            let digits = leading_digits(&rest[i + pat.len()..]);
            let tail = &rest[i + pat.len() + digits.len()..];
            if digits.is_empty() || !tail.starts_with(", %sp")
            {
                return None;
            }

            // detected (non-cross) targets only count the larger frames
            let large = digits.len() == 4
                || (digits.len() == 3 && digits.as_bytes()[0] >= b'3');
            if !cross && !large
            {
                return None;
            }
            digits.parse().ok()
        })
}

fn arm_sub(line: &str) -> Option<u64>
{
    let rest = &line[line.find("sub")? + "sub".len()..];

    rest.rmatch_indices("sp, #")
        .find_map(|(i, pat)|
        {
            let digits = leading_digits(&rest[i + pat.len()..]);
            if digits.is_empty() { None } else { digits.parse().ok() }
        })
}

fn leading_digits(s: &str) -> &str
{
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    &s[..end]
}



/// Names of the binutils used to dump a binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain
{
    pub objdump: String,
    pub nm:      String,
}

impl Toolchain
{
    pub fn with_prefix(prefix: &str) -> Self
    {
        Toolchain
        {
            objdump: format!("{}objdump", prefix),
            nm:      format!("{}nm", prefix),
        }
    }

    pub fn for_isa(isa: Isa) -> Self
    {
        Toolchain::with_prefix(isa.default_prefix())
    }
}
