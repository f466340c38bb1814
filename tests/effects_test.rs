// Engine-level behavior: state threading, exception short-circuiting,
// catch points, scoped sub-effects, and composition identities.

use proptest::prelude::*;
use resourcery::contexts::PureContext;
use resourcery::effects::except::raise;
use resourcery::effects::state::{Get, Put, PutM};
use resourcery::middleware::Record;
use resourcery::program::{catch, perform, scoped, Eff};
use resourcery::resources;
use resourcery::EffectError;

#[derive(Clone, Copy)]
struct Counter;
#[derive(Clone, Copy)]
struct Tag;
#[derive(Clone, Copy)]
struct Exn;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn state_updates_thread_through_bind() -> anyhow::Result<()> {
    init_tracing();
    let program = perform(Counter, Get::<i32>::new())
        .and_then(|n| perform(Counter, Put(n * 2)))
        .and_then(|_| perform(Counter, Get::<i32>::new()));

    let (env, value) = program.run(resources![Counter => 21], &mut PureContext::new())?;
    assert_eq!(value, 42);
    assert_eq!(*env.0.state(), 42);
    Ok(())
}

#[test]
fn untouched_effects_keep_state_and_position() -> anyhow::Result<()> {
    let program =
        perform(Counter, Put(7i32)).and_then(|_| perform(Tag, Get::<String>::new()));

    let env = resources![Counter => 0i32, Tag => "label".to_string()];
    let (env, tag) = program.run(env, &mut PureContext::new())?;
    assert_eq!(tag, "label");
    assert_eq!(*env.0.state(), 7);
    assert_eq!(env.1 .0.state(), "label");
    Ok(())
}

#[test]
fn put_m_changes_the_resource_type() -> anyhow::Result<()> {
    let program = perform(Counter, Get::<i32>::new())
        .and_then(|n| perform(Counter, PutM::<i32, String>::new(format!("was {n}"))))
        .and_then(|_| perform(Counter, Get::<String>::new()));

    let (env, label) = program.run(resources![Counter => 5], &mut PureContext::new())?;
    assert_eq!(label, "was 5");
    assert_eq!(env.0.state(), "was 5");
    Ok(())
}

#[test]
fn raise_skips_everything_downstream() {
    let mut ctx = Record::new(PureContext::new());
    let log = ctx.log();

    let program = perform(Counter, Put(1i32))
        .and_then(|_| raise(Exn, "boom"))
        .and_then(|_: ()| perform(Counter, Put(3i32)));

    let err = program
        .run(resources![Counter => 0i32, Exn => ()], &mut ctx)
        .unwrap_err();
    match err {
        EffectError::Unhandled { effect, message } => {
            assert_eq!(effect, "except");
            assert!(message.contains("boom"));
        }
        other => panic!("expected Unhandled, got {other:?}"),
    }
    // Nothing dispatched after the raise.
    assert_eq!(log.ops(), vec!["state.put", "except.raise"]);
}

#[test]
fn catch_recovers_on_the_entry_snapshot() -> anyhow::Result<()> {
    let protected = perform(Counter, Put(99i32))
        .and_then(|_| raise(Exn, 404i32))
        .and_then(|_: ()| Eff::pure("unreachable".to_string()));

    let program = catch(protected, |code: i32| Eff::pure(format!("recovered {code}")));

    let env = resources![Counter => 0i32, Exn => ()];
    let (env, value) = program.run(env, &mut PureContext::new())?;
    assert_eq!(value, "recovered 404");
    // The write inside the protected region was rolled back.
    assert_eq!(*env.0.state(), 0);
    Ok(())
}

#[test]
fn catch_passes_through_other_payload_types() {
    let protected = raise(Exn, 3u8).and_then(|_: ()| Eff::pure(()));
    let program = catch(protected, |_: String| Eff::pure(()));

    let err = program
        .run(resources![Counter => 0i32, Exn => ()], &mut PureContext::new())
        .unwrap_err();
    assert!(matches!(err, EffectError::Unhandled { effect: "except", .. }));
}

#[test]
fn scoped_effect_does_not_leak() -> anyhow::Result<()> {
    #[derive(Clone, Copy)]
    struct Temp;

    let program = perform(Counter, Get::<i32>::new()).and_then(|n| {
        scoped(
            Temp,
            n * 10,
            perform(Temp, Get::<i32>::new())
                .and_then(|t| perform(Counter, Put(t + 1)).map(move |_| t)),
        )
    });

    let (env, seen) = program.run(resources![Counter => 4], &mut PureContext::new())?;
    assert_eq!(seen, 40);
    assert_eq!(*env.0.state(), 41);
    Ok(())
}

#[test]
fn abort_discards_a_scoped_effect() {
    #[derive(Clone, Copy)]
    struct Temp;

    let program = scoped(Temp, 0i32, raise(Exn, "in-scope"));
    let result: Result<(_, ()), _> =
        program.run(resources![Counter => 0i32, Exn => ()], &mut PureContext::new());
    assert!(result.is_err());
}

#[test]
fn no_op_composition_is_identity() -> anyhow::Result<()> {
    let bare = perform(Counter, Get::<i32>::new())
        .and_then(|n| perform(Counter, Put(n + 1)).map(move |_| n));
    let padded = Eff::pure(())
        .and_then(|_| perform(Counter, Get::<i32>::new()))
        .and_then(|n| perform(Counter, Put(n + 1)).map(move |_| n))
        .and_then(Eff::pure);

    let (bare_env, bare_out) = bare.run(resources![Counter => 10], &mut PureContext::new())?;
    let (padded_env, padded_out) =
        padded.run(resources![Counter => 10], &mut PureContext::new())?;
    assert_eq!(bare_out, padded_out);
    assert_eq!(bare_env.0.state(), padded_env.0.state());
    Ok(())
}

proptest! {
    #[test]
    fn raise_is_absorbing_for_any_payload(payload in any::<i32>(), later in any::<i32>()) {
        let protected = raise(Exn, payload)
            .and_then(move |_: ()| perform(Counter, Put(later)))
            .and_then(|_| perform(Counter, Get::<i32>::new()));
        let program = catch(protected, |err: i32| Eff::pure(err));

        let env = resources![Counter => 0i32, Exn => ()];
        let (env, value) = program.run(env, &mut PureContext::new()).unwrap();
        // The payload reaches the catch point intact and the write
        // after the raise never happened.
        prop_assert_eq!(value, payload);
        prop_assert_eq!(*env.0.state(), 0);
    }
}
