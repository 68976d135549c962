use std::{
    ffi::OsStr,
    fs,
    path::Path,
    process::Command,
};

use log::{debug, info};

use crate::arch::Toolchain;
use crate::error::Error;



/// Runs `tool` with `args` and returns its standard output.
pub fn run(tool: &str, args: &[&OsStr]) -> Result<String, Error>
{
    let mut cmd = Command::new(tool);
    cmd.args(args);
    debug!("{:?}", cmd);

    let output = cmd.output().map_err(|source| Error::Spawn { tool: tool.to_string(), source })?;

    if !output.status.success()
    {
        return Err(Error::Tool
        {
            tool:   tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Symbol dump of `binary`, as printed by `nm`.
pub fn nm(toolchain: &Toolchain, binary: &Path) -> Result<String, Error>
{
    info!("reading symbols with `{}`", toolchain.nm);
    run(&toolchain.nm, &[binary.as_os_str()])
}

/// Disassembly of `binary`, as printed by `objdump -d`.
pub fn objdump(toolchain: &Toolchain, binary: &Path) -> Result<String, Error>
{
    info!("disassembling with `{}`", toolchain.objdump);
    run(&toolchain.objdump, &[OsStr::new("-d"), binary.as_os_str()])
}

/// Contents of a previously captured dump.
pub fn read_dump(path: &Path) -> Result<String, Error>
{
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}


#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn missing_tools_fail_to_spawn()
    {
        let toolchain = Toolchain::with_prefix("definitely-not-a-real-prefix-");
        let err = nm(&toolchain, Path::new("a.out")).unwrap_err();

        assert!(matches!(err, Error::Spawn { ref tool, .. } if tool == "definitely-not-a-real-prefix-nm"));
    }

    #[test]
    fn missing_dumps_are_io_errors()
    {
        assert!(matches!(read_dump(Path::new("/nonexistent/dump.txt")), Err(Error::Io { .. })));
    }
}
