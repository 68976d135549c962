use std::{borrow::Cow, io};

use crate::resolver::Recursion;
use crate::{CallChain, Usage};



/// Settings for the text report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportConf
{
    /// Demangle Rust symbol names. Other names pass through unchanged.
    pub demangle: bool,
}


///
/// Worst-case results for a batch of roots, ready to print.
///
/// One line per root, `<total>: <root> (<name>(<cost>),...)`, in the order
/// given, which `Resolver::resolve_all` already sorts by ascending total.
///
pub struct Report<'a>
{
    pub results:    &'a [(String, Usage)],
    pub recursions: &'a [Recursion],
    pub conf:       ReportConf,
}

impl<'a> Report<'a>
{
    pub fn new(results: &'a [(String, Usage)], recursions: &'a [Recursion], conf: ReportConf) -> Self
    {
        Report { results, recursions, conf }
    }

    fn name<'n>(&self, name: &'n str) -> Cow<'n, str>
    {
        if self.conf.demangle
        {
            Cow::Owned(rustc_demangle::demangle(name).to_string())
        }
        else
        {
            Cow::Borrowed(name)
        }
    }

    fn chain(&self, chain: &CallChain) -> String
    {
        chain.frames()
            .iter()
            .map(|frame| format!("{}({})", self.name(&frame.name), frame.cost))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn output_recursions(&self, mut writer: impl io::Write) -> io::Result<()>
    {
        for recursion in self.recursions
        {
            writeln!(
                writer,
                "[x] Recursion detected: {} is called from {} in this chain: [{}]",
                self.name(&recursion.function),
                recursion.caller.as_deref().map_or(Cow::Borrowed("?"), |c| self.name(c)),
                self.chain(&recursion.chain),
            )?;
        }
        Ok(())
    }

    pub fn output_text(&self, mut writer: impl io::Write) -> io::Result<()>
    {
        for (root, usage) in self.results
        {
            writeln!(
                writer,
                "{:>10}: {} ({})",
                usage.total,
                self.name(root),
                self.chain(&usage.chain)
            )?;
        }
        Ok(())
    }
}
