use std::sync::{Arc, Mutex};

use strata_di::{Container, DiError, HookOptions, Instance, Provider, Token};

#[test]
fn listeners_fire_in_order_across_registrations() {
    let token = Token::new("Service");
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let root = Container::builder()
        .provide(&token, Provider::value(1u32))
        .build()
        .unwrap();

    let hooks = root.hooks();
    let l = log.clone();
    hooks
        .register(
            &token,
            HookOptions::new().before(10, move |_| l.lock().unwrap().push("late".into())),
        )
        .unwrap();
    let l = log.clone();
    hooks
        .register(
            &token,
            HookOptions::new()
                .before(-5, move |_| l.lock().unwrap().push("early".into())),
        )
        .unwrap();
    let l = log.clone();
    hooks
        .register(
            &token,
            HookOptions::new().after(0, move |_, _| l.lock().unwrap().push("after".into())),
        )
        .unwrap();

    root.get::<u32>(&token).unwrap();
    assert_eq!(*log.lock().unwrap(), ["early", "late", "after"]);
}

#[test]
fn custom_factory_wraps_base_construction() {
    let token = Token::new("Doubled");
    let root = Container::builder()
        .provide(
            &token,
            Provider::factory(vec![], |_| Ok(Arc::new(21u32) as Instance)),
        )
        .build()
        .unwrap();

    root.hooks()
        .register(
            &token,
            HookOptions::new().custom_factory(|_, base, _| {
                let value = base()?;
                let n = value.downcast::<u32>().ok().unwrap();
                Ok(Arc::new(*n * 2) as Instance)
            }),
        )
        .unwrap();

    assert_eq!(*root.get::<u32>(&token).unwrap(), 42);
}

#[test]
fn error_listener_substitutes_a_failed_construction() {
    let token = Token::new("Flaky");
    let root = Container::builder()
        .provide(
            &token,
            Provider::factory(vec![], |_| {
                Err(DiError::Construction("backend down".to_string()))
            }),
        )
        .build()
        .unwrap();

    root.hooks()
        .register(
            &token,
            HookOptions::new().on_error(0, |_, _| Some(Arc::new(99u32) as Instance)),
        )
        .unwrap();

    assert_eq!(*root.get::<u32>(&token).unwrap(), 99);
}

fn multi_fixture(token: &Token) -> Container {
    Container::builder()
        .provide(token, Provider::value(1u32).multi())
        .provide(token, Provider::value(2u32).multi())
        .build()
        .unwrap()
}

#[test]
fn sync_multi_runs_listeners_per_contributor() {
    let token = Token::new("Plugins");
    let root = multi_fixture(&token);
    let log: Arc<Mutex<Vec<&str>>> = Arc::new(Mutex::new(Vec::new()));

    let l = log.clone();
    let a = log.clone();
    root.hooks()
        .register(
            &token,
            HookOptions::new()
                .before(0, move |_| l.lock().unwrap().push("before"))
                .after(0, move |_, _| a.lock().unwrap().push("after")),
        )
        .unwrap();

    root.get_all::<u32>(&token).unwrap();
    assert_eq!(*log.lock().unwrap(), ["before", "after", "before", "after"]);
}

#[tokio::test]
async fn async_multi_runs_listeners_per_contributor() {
    let token = Token::new("Plugins");
    let root = multi_fixture(&token);
    let log: Arc<Mutex<Vec<&str>>> = Arc::new(Mutex::new(Vec::new()));

    let l = log.clone();
    let a = log.clone();
    root.hooks()
        .register(
            &token,
            HookOptions::new()
                .before(0, move |_| l.lock().unwrap().push("before"))
                .after(0, move |_, _| a.lock().unwrap().push("after")),
        )
        .unwrap();

    root.get_all_async::<u32>(&token).await.unwrap();
    let fired = log.lock().unwrap();
    assert_eq!(fired.iter().filter(|e| **e == "before").count(), 2);
    assert_eq!(fired.iter().filter(|e| **e == "after").count(), 2);
}

fn rescue_fixture(token: &Token) -> Container {
    let root = Container::builder()
        .provide(token, Provider::value(1u32).multi())
        .provide(
            token,
            Provider::factory(vec![], |_| {
                Err(DiError::Construction("bad contributor".to_string()))
            })
            .multi(),
        )
        .build()
        .unwrap();
    root.hooks()
        .register(
            &token,
            HookOptions::new().on_error(0, |_, _| Some(Arc::new(99u32) as Instance)),
        )
        .unwrap();
    root
}

#[test]
fn error_listener_rescues_a_failed_contributor() {
    let token = Token::new("Plugins");
    let root = rescue_fixture(&token);
    let all = root.get_all::<u32>(&token).unwrap();
    assert_eq!(all.iter().map(|v| **v).collect::<Vec<u32>>(), [1, 99]);
}

#[tokio::test]
async fn error_listener_rescues_a_failed_contributor_async() {
    let token = Token::new("Plugins");
    let root = rescue_fixture(&token);
    let all = root.get_all_async::<u32>(&token).await.unwrap();
    assert_eq!(all.iter().map(|v| **v).collect::<Vec<u32>>(), [1, 99]);
}

#[test]
fn second_singleton_hook_fails_fast() {
    let token = Token::new("Guarded");
    let root = Container::builder().build().unwrap();

    root.hooks()
        .register(&token, HookOptions::new().transient(|_| true))
        .unwrap();
    let err = root
        .hooks()
        .register(&token, HookOptions::new().transient(|_| false))
        .unwrap_err();
    match err {
        DiError::DuplicateHook { token, kind } => {
            assert_eq!(token, "Guarded");
            assert_eq!(kind, "transience");
        }
        other => panic!("expected DuplicateHook, got {:?}", other),
    }
}

#[test]
fn inherited_hooks_apply_until_first_own_write() {
    let base = Token::new("Base");
    let derived = Token::new("Derived");
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let root = Container::builder()
        .provide(&derived, Provider::value(1u32))
        .build()
        .unwrap();
    let hooks = root.hooks();
    hooks.inherit(&derived, &base);

    let l = log.clone();
    hooks
        .register(
            &base,
            HookOptions::new().before(0, move |t| l.lock().unwrap().push(t.name().into())),
        )
        .unwrap();

    // No hooks of its own yet, so the derived token sees the base's.
    root.get::<u32>(&derived).unwrap();
    assert_eq!(*log.lock().unwrap(), ["Derived"]);

    // First own write copies the inherited store.
    let l = log.clone();
    hooks
        .register(
            &derived,
            HookOptions::new().before(1, move |_| l.lock().unwrap().push("own".into())),
        )
        .unwrap();

    // Later changes to the base no longer reach the derived token.
    let l = log.clone();
    hooks
        .register(
            &base,
            HookOptions::new().before(-1, move |_| l.lock().unwrap().push("base-only".into())),
        )
        .unwrap();

    log.lock().unwrap().clear();
    root.hooks()
        .register(&derived, HookOptions::new().transient(|_| true))
        .unwrap();
    root.get::<u32>(&derived).unwrap();
    assert_eq!(*log.lock().unwrap(), ["Derived", "own"]);
}

#[test]
fn admission_hook_vetoes_registration() {
    let token = Token::new("Vetoed");
    let root = Container::builder().build().unwrap();

    root.hooks()
        .register(&token, HookOptions::new().admission(|_, _| false))
        .unwrap();

    assert!(!root.set(&token, Provider::value(1u32)).unwrap());
    assert!(matches!(
        root.get::<u32>(&token),
        Err(DiError::NoProvider(_))
    ));
}
