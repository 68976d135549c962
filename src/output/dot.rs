use std::{
    collections::HashMap,
    io,
    io::Write as _, // to get write_fmt, granting writeln!
};

use crate::callgraph::CallGraph;
use crate::costs::StackCosts;
use crate::output::escaper::Escaper;
use crate::Usage;





impl CallGraph
{
    ///
    /// Writes the call graph in GraphViz `dot` syntax.
    ///
    /// Each node shows the function's local cost (`?` when unknown) and,
    /// for resolved roots, the worst-case total. Functions never defined in
    /// the binary are dashed; recursive groups are drawn as clusters.
    ///
    pub fn output_dot(
        &self,
        mut writer: impl io::Write,
        costs: &StackCosts,
        results: &[(String, Usage)],
        dc: &DotConf,
    ) -> io::Result<()>
    {
        let totals: HashMap<&str, u64> = results
            .iter()
            .map(|(name, usage)| (name.as_str(), usage.total))
            .collect();

        writeln!(writer, "digraph {{")?;
        writeln!(writer, "    node [fontname={} shape=box]", &dc.font)?;

        for (i, node) in self.g.raw_nodes().iter().enumerate() {
            let function = &node.weight;

            write!(writer, "    {} [label=\"", i)?;

            let mut esc = Escaper::new(&mut writer);
            if dc.demangle {
                write!(esc, "{}", rustc_demangle::demangle(&function.name))?;
            } else {
                write!(esc, "{}", function.name)?;
            }

            if let Some(total) = totals.get(function.name.as_str()) {
                write!(writer, "\\nmax = {}", total)?;
            }

            match costs.best(&function.name) {
                Some(local) => write!(writer, "\\nlocal = {}\"", local)?,
                None        => write!(writer, "\\nlocal = ?\"")?,
            }

            if !function.defined {
                write!(writer, " style=dashed")?;
            }

            writeln!(writer, "]")?;
        }

        for edge in self.g.raw_edges() {
            writeln!(
                writer,
                "    {} -> {}",
                edge.source().index(),
                edge.target().index()
            )?;
        }

        for (i, group) in self.recursive_groups().iter().enumerate() {
            writeln!(writer, "\n    subgraph cluster_{} {{", i)?;
            writeln!(writer, "        style=dashed")?;
            writeln!(writer, "        fontname={}", &dc.font)?;
            writeln!(writer, "        label=\"recursion {}\"", i)?;

            for name in group {
                if let Some(idx) = self.indices.get(*name) {
                    writeln!(writer, "        {}", idx.index())?;
                }
            }

            writeln!(writer, "    }}")?;
        }

        writeln!(writer, "}}")?;

        Ok(())
    }
}



#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DotConf
{
    pub font:     String,
    pub demangle: bool,
}

impl Default for DotConf
{
    fn default() -> Self
    {
        DotConf
        {
            font:     "monospace".to_string(),
            demangle: false,
        }
    }
}
