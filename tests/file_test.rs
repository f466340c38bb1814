// File protocol runs against both the in-memory and the real
// file-system contexts. Protocol violations are build errors (covered
// by the compile_fail doctests on the file module); these tests cover
// the runtime behavior of legal chains.

use resourcery::contexts::{FsContext, MemFsContext};
use resourcery::effects::file::{
    Close, Closed, Eof, Open, ReadLine, ReadMode, WriteLine, WriteMode,
};
use resourcery::effects::state::{Get, Put};
use resourcery::program::{check, perform, scoped, Eff};
use resourcery::resources;

#[derive(Clone, Copy)]
struct F;

#[test]
fn read_chain_consumes_lines_in_order() -> anyhow::Result<()> {
    let mut ctx = MemFsContext::new();
    ctx.insert_file("notes.txt", "first\nsecond");

    let program = perform(F, Open::<ReadMode>::new("notes.txt")).and_then(|_| {
        check(
            F,
            Eff::pure((Vec::new(), true)),
            perform(F, ReadLine).and_then(|one| {
                perform(F, ReadLine).and_then(move |two| {
                    perform(F, Eof).and_then(move |eof| {
                        perform(F, Close::new()).map(move |_| (vec![one, two], eof))
                    })
                })
            }),
        )
    });

    let (_, (lines, eof)) = program.run(resources![F => Closed], &mut ctx)?;
    assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
    assert!(eof);
    Ok(())
}

#[test]
fn open_without_reading_is_a_legal_chain() -> anyhow::Result<()> {
    let mut ctx = MemFsContext::new();
    ctx.insert_file("notes.txt", "unread");

    let program = perform(F, Open::<ReadMode>::new("notes.txt")).and_then(|_| {
        check(
            F,
            Eff::pure(false),
            perform(F, Close::new()).map(|_| true),
        )
    });

    let (env, opened) = program.run(resources![F => Closed], &mut ctx)?;
    assert!(opened);
    assert_eq!(*env.0.state(), Closed);
    Ok(())
}

#[test]
fn missing_file_takes_the_failure_branch() -> anyhow::Result<()> {
    let program = perform(F, Open::<ReadMode>::new("no-such-file.txt")).and_then(|_| {
        check(
            F,
            Eff::pure("failed".to_string()),
            perform(F, ReadLine).and_then(|line| perform(F, Close::new()).map(move |_| line)),
        )
    });

    let (_, outcome) = program.run(resources![F => Closed], &mut MemFsContext::new())?;
    assert_eq!(outcome, "failed");
    Ok(())
}

#[test]
fn forced_failure_overrides_an_existing_file() -> anyhow::Result<()> {
    let mut ctx = MemFsContext::new();
    ctx.insert_file("notes.txt", "present");
    ctx.fail_next_open();

    let program = perform(F, Open::<ReadMode>::new("notes.txt")).and_then(|_| {
        check(
            F,
            Eff::pure(false),
            perform(F, Close::new()).map(|_| true),
        )
    });

    let (_, opened) = program.run(resources![F => Closed], &mut ctx)?;
    assert!(!opened);

    // Only the next open fails; the one after sees the file again.
    let retry = perform(F, Open::<ReadMode>::new("notes.txt")).and_then(|_| {
        check(
            F,
            Eff::pure(false),
            perform(F, Close::new()).map(|_| true),
        )
    });
    let (_, opened) = retry.run(resources![F => Closed], &mut ctx)?;
    assert!(opened);
    Ok(())
}

#[test]
fn written_lines_land_in_the_table_on_close() -> anyhow::Result<()> {
    let ctx = &mut MemFsContext::new();

    let program = perform(F, Open::<WriteMode>::new("out.txt")).and_then(|_| {
        check(
            F,
            Eff::pure(()),
            perform(F, WriteLine("alpha".to_string()))
                .and_then(|_| perform(F, WriteLine("beta".to_string())))
                .and_then(|_| perform(F, Close::new())),
        )
    });

    program.run(resources![F => Closed], ctx)?;
    assert_eq!(ctx.contents("out.txt").as_deref(), Some("alpha\nbeta"));
    Ok(())
}

#[test]
fn real_fs_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("journal.txt");
    let mut ctx = FsContext::new();

    let write = perform(F, Open::<WriteMode>::new(path.clone())).and_then(|_| {
        check(
            F,
            Eff::pure(()),
            perform(F, WriteLine("entry one".to_string()))
                .and_then(|_| perform(F, WriteLine("entry two".to_string())))
                .and_then(|_| perform(F, Close::new())),
        )
    });
    write.run(resources![F => Closed], &mut ctx)?;

    let read = perform(F, Open::<ReadMode>::new(path)).and_then(|_| {
        check(
            F,
            Eff::pure(Vec::new()),
            perform(F, ReadLine).and_then(|one| {
                perform(F, ReadLine).and_then(move |two| {
                    perform(F, Close::new()).map(move |_| vec![one, two])
                })
            }),
        )
    });
    let (_, lines) = read.run(resources![F => Closed], &mut ctx)?;
    assert_eq!(
        lines,
        vec!["entry one".to_string(), "entry two".to_string()]
    );
    Ok(())
}

#[test]
fn file_effect_can_be_scoped_next_to_state() -> anyhow::Result<()> {
    #[derive(Clone, Copy)]
    struct Count;

    let mut ctx = MemFsContext::new();
    ctx.insert_file("data.txt", "x\ny\nz");

    // Count the lines of a file through a scoped file effect; only the
    // counter survives the scope.
    let program = scoped(
        F,
        Closed,
        perform(F, Open::<ReadMode>::new("data.txt")).and_then(|_| {
            check(
                F,
                Eff::pure(()),
                perform(F, ReadLine)
                    .and_then(|_| perform(Count, Get::<u32>::new()))
                    .and_then(|n| perform(Count, Put(n + 1)))
                    .and_then(|_| perform(F, ReadLine))
                    .and_then(|_| perform(Count, Get::<u32>::new()))
                    .and_then(|n| perform(Count, Put(n + 1)))
                    .and_then(|_| perform(F, Close::new())),
            )
        }),
    );

    let (env, ()) = program.run(resources![Count => 0u32], &mut ctx)?;
    assert_eq!(*env.0.state(), 2);
    Ok(())
}
