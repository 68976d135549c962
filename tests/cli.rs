use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use tempfile::{tempdir, TempDir};

const NM: &str = "\
40001000 T main
40001014 T f
";

const OBJDUMP: &str = "
prog:     file format elf32-sparc


Disassembly of section .text:

40001000 <main>:
40001000:\t9d e3 bf 98 \tsave  %sp, -104, %sp
40001004:\t40 00 00 04 \tcall  40001014 <f>
40001008:\t01 00 00 00 \tnop
4000100c:\t81 c7 e0 08 \tret
40001010:\t81 e8 00 00 \trestore

40001014 <f>:
40001014:\t9d e3 bf a0 \tsave  %sp, -96, %sp
40001018:\t81 c7 e0 08 \tret
4000101c:\t81 e8 00 00 \trestore
";

struct Fixture
{
    dir:      TempDir,
    binary:   PathBuf,
    su_root:  PathBuf,
    nm:       PathBuf,
    objdump:  PathBuf,
}

impl Fixture
{
    fn new() -> Self
    {
        let dir = tempdir().unwrap();
        let binary = dir.path().join("prog.elf");
        let su_root = dir.path().join("su");
        let nm = dir.path().join("prog.nm");
        let objdump = dir.path().join("prog.dis");

        fs::write(&binary, b"not really an ELF").unwrap();
        fs::create_dir(&su_root).unwrap();
        fs::write(&nm, NM).unwrap();
        fs::write(&objdump, OBJDUMP).unwrap();

        Fixture { dir, binary, su_root, nm, objdump }
    }

    fn dumps(&self) -> Vec<String>
    {
        vec![
            "--nm-output".to_string(),
            path(&self.nm),
            "--objdump-output".to_string(),
            path(&self.objdump),
        ]
    }
}

fn path(p: &Path) -> String
{
    p.to_str().unwrap().to_string()
}

fn run<S: AsRef<str>>(args: &[S]) -> Output
{
    Command::new(env!("CARGO_BIN_EXE_check-stack-usage"))
        .args(args.iter().map(|a| a.as_ref()))
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String
{
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String
{
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn single_dash_cross_with_saved_dumps()
{
    let fx = Fixture::new();
    let mut args = vec!["-cross".to_string(), "sparc-x-".to_string(), path(&fx.binary), path(&fx.su_root)];
    args.extend(fx.dumps());

    let out = run(&args);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "        96: f (f(96))\n       200: main (main(104),f(96))\n"
    );
}

#[test]
fn double_dash_cross_is_accepted_too()
{
    let fx = Fixture::new();
    let mut args = vec!["--cross".to_string(), "sparc-x-".to_string(), path(&fx.binary), path(&fx.su_root)];
    args.extend(fx.dumps());

    let out = run(&args);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stdout(&out).ends_with("       200: main (main(104),f(96))\n"));
}

#[test]
fn trailing_functions_restrict_the_report()
{
    let fx = Fixture::new();
    let mut args = vec![
        "-cross".to_string(),
        "sparc-x-".to_string(),
        path(&fx.binary),
        path(&fx.su_root),
        "f".to_string(),
        "no_such_function".to_string(),
    ];
    args.extend(fx.dumps());

    let out = run(&args);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "        96: f (f(96))\n");
}

#[test]
fn su_records_raise_the_disassembly_figure()
{
    let fx = Fixture::new();
    fs::write(fx.su_root.join("main.su"), "main.c:3:5:main\t128\tstatic\n").unwrap();
    let mut args = vec!["-cross".to_string(), "sparc-x-".to_string(), path(&fx.binary), path(&fx.su_root)];
    args.extend(fx.dumps());

    let out = run(&args);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("       224: main (main(128),f(96))\n"));
}

#[test]
fn missing_arguments_exit_with_1()
{
    let out = run::<&str>(&[]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn help_exits_with_0()
{
    let out = run(&["--help"]);

    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("check-stack-usage"));
}

#[test]
fn a_missing_binary_exits_with_1()
{
    let fx = Fixture::new();
    let missing = fx.dir.path().join("nowhere.elf");

    let out = run(&[path(&missing), path(&fx.su_root)]);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("is not a file"));
}

#[test]
fn an_su_root_that_is_not_a_directory_exits_with_1()
{
    let fx = Fixture::new();

    let out = run(&[path(&fx.binary), path(&fx.nm)]);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("is not a directory"));
}

#[test]
fn a_non_elf_binary_without_cross_exits_with_1()
{
    let fx = Fixture::new();
    let mut args = vec![path(&fx.binary), path(&fx.su_root)];
    args.extend(fx.dumps());

    let out = run(&args);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("not a valid ELF"));
}

#[test]
fn an_unknown_architecture_without_cross_exits_with_1()
{
    let fx = Fixture::new();

    // ELF32 little-endian header for a MIPS executable, no sections
    let mut header = vec![0x7f, b'E', b'L', b'F', 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    header.extend_from_slice(&2u16.to_le_bytes()); // e_type: EXEC
    header.extend_from_slice(&8u16.to_le_bytes()); // e_machine: MIPS
    header.extend_from_slice(&1u32.to_le_bytes()); // e_version
    header.extend_from_slice(&[0; 12]); // entry, phoff, shoff
    header.extend_from_slice(&0u32.to_le_bytes()); // flags
    header.extend_from_slice(&52u16.to_le_bytes()); // ehsize
    header.extend_from_slice(&[0; 10]); // phentsize .. shstrndx
    let mips = fx.dir.path().join("mips.elf");
    fs::write(&mips, &header).unwrap();

    let mut args = vec![path(&mips), path(&fx.su_root)];
    args.extend(fx.dumps());

    let out = run(&args);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("please use -cross"), "stderr: {}", stderr(&out));
}
