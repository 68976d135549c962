//! Worst-case stack usage along every call path of a compiled binary.
//!
//! The crate consumes three textual inputs (an `nm` symbol dump, an
//! `objdump -d` disassembly and the `.su` files GCC writes with
//! `-fstack-usage`), builds a call graph from them and walks it to find,
//! per function, the deepest path in bytes of stack.

pub mod arch;
pub mod callgraph;
pub mod costs;
pub mod error;
pub mod output;
pub mod resolver;
pub mod su;
pub mod symbols;
pub mod tools;

pub use arch::{Isa, Toolchain};
pub use callgraph::{BaselineCosts, CallGraph};
pub use costs::StackCosts;
pub use error::Error;
pub use resolver::{Recursion, Resolver};
pub use su::StackUsage;
pub use symbols::SymbolTable;

use core::fmt;









/*       ██████╗ █████╗ ██╗     ██╗     ███████╗      */
/*      ██╔════╝██╔══██╗██║     ██║     ██╔════╝      */
/*      ██║     ███████║██║     ██║     ███████╗      */
/*      ██║     ██╔══██║██║     ██║     ╚════██║      */
/*      ╚██████╗██║  ██║███████╗███████╗███████║      */
/*       ╚═════╝╚═╝  ╚═╝╚══════╝╚══════╝╚══════╝      */
/*     █████████████████████████████████████████╗     */
/*     ╚════════════════════════════════════════╝     */

/// One frame of a call path: a function and the local stack it was charged.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Frame
{
    pub name: String,
    pub cost: u64,
}

impl fmt::Display for Frame
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        write!(f, "{}({})", self.name, self.cost)
    }
}

///
/// Path from an analysis root down to the current frame.
///
/// Never mutated in place once shared: `extended` hands back a new chain,
/// so sibling branches of the call graph each carry their own copy.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallChain
{
    frames: Vec<Frame>,
    total:  u64,
}

impl CallChain
{
    pub fn new() -> Self
    {
        CallChain::default()
    }

    pub fn frames(&self) -> &[Frame]
    {
        &self.frames
    }

    /// Sum of the costs of every frame in the chain.
    pub fn total(&self) -> u64
    {
        self.total
    }

    pub fn len(&self) -> usize
    {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.frames.is_empty()
    }

    /// The immediate caller of whatever gets resolved next.
    pub fn last(&self) -> Option<&Frame>
    {
        self.frames.last()
    }

    pub fn contains(&self, name: &str) -> bool
    {
        self.frames.iter().any(|frame| frame.name == name)
    }

    pub fn extended(&self, name: &str, cost: u64) -> CallChain
    {
        let mut frames = Vec::with_capacity(self.frames.len() + 1);
        frames.extend_from_slice(&self.frames);
        frames.push(Frame { name: name.to_string(), cost });

        CallChain
        {
            frames,
            total: self.total.saturating_add(cost),
        }
    }
}

impl fmt::Display for CallChain
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        for (i, frame) in self.frames.iter().enumerate()
        {
            if i > 0
            {
                f.write_str(",")?;
            }
            write!(f, "{}", frame)?;
        }
        Ok(())
    }
}

impl<'a> FromIterator<(&'a str, u64)> for CallChain
{
    fn from_iter<I: IntoIterator<Item = (&'a str, u64)>>(iter: I) -> Self
    {
        iter.into_iter()
            .fold(CallChain::new(), |chain, (name, cost)| chain.extended(name, cost))
    }
}











/*      ████████╗ ██████╗ ████████╗ █████╗ ██╗           */
/*      ╚══██╔══╝██╔═══██╗╚══██╔══╝██╔══██╗██║           */
/*         ██║   ██║   ██║   ██║   ███████║██║           */
/*         ██║   ██║   ██║   ██║   ██╔══██║██║           */
/*         ██║   ╚██████╔╝   ██║   ██║  ██║███████╗      */
/*         ╚═╝    ╚═════╝    ╚═╝   ╚═╝  ╚═╝╚══════╝      */
/*     ████████████████████████████████████████████╗     */
/*     ╚═══════════════════════════════════════════╝     */

/// Worst-case result for one root: the total and the path that produces it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Usage
{
    pub total: u64,
    pub chain: CallChain,
}

impl Usage
{
    pub fn of(chain: CallChain) -> Self
    {
        Usage
        {
            total: chain.total(),
            chain,
        }
    }
}
