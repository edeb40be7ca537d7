use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use strata_di::{
    AsyncDispose, Container, DiError, Dispose, HookOptions, InjectFlags, Instance, Provider,
    Token,
};

struct Tracked {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Dispose for Tracked {
    fn dispose(&self) {
        self.log.lock().unwrap().push(self.name.to_string());
    }
}

fn tracked(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Provider {
    let log = log.clone();
    Provider::factory(vec![], move |_| {
        Ok(Arc::new(Tracked {
            name,
            log: log.clone(),
        }) as Instance)
    })
    .disposable::<Tracked>()
}

#[tokio::test]
async fn destroy_disposes_in_reverse_creation_order() {
    let tx = Token::new("X");
    let ty = Token::new("Y");
    let log = Arc::new(Mutex::new(Vec::new()));

    let root = Container::builder()
        .provide(&tx, tracked("x", &log))
        .provide(&ty, tracked("y", &log))
        .build()
        .unwrap();

    root.get::<Tracked>(&tx).unwrap();
    root.get::<Tracked>(&ty).unwrap();

    root.destroy().await;
    assert_eq!(*log.lock().unwrap(), ["y", "x"]);

    // Idempotent.
    root.destroy().await;
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn async_teardown_is_awaited() {
    struct Conn {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AsyncDispose for Conn {
        async fn dispose(&self) {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.log.lock().unwrap().push("closed".to_string());
        }
    }

    let token = Token::new("Conn");
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_in = log.clone();

    let root = Container::builder()
        .provide(
            &token,
            Provider::factory(vec![], move |_| {
                Ok(Arc::new(Conn { log: log_in.clone() }) as Instance)
            })
            .async_disposable::<Conn>(),
        )
        .build()
        .unwrap();

    root.get::<Conn>(&token).unwrap();
    root.destroy().await;
    assert_eq!(*log.lock().unwrap(), ["closed"]);
}

#[tokio::test]
async fn dispose_listeners_run_during_destroy() {
    let token = Token::new("Service");
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log_in = log.clone();

    let root = Container::builder()
        .provide(&token, Provider::value(1u32))
        .build()
        .unwrap();
    root.hooks()
        .register(
            &token,
            HookOptions::new()
                .on_dispose(0, move |t, _| log_in.lock().unwrap().push(t.name().into())),
        )
        .unwrap();

    root.get::<u32>(&token).unwrap();
    root.destroy().await;
    assert_eq!(*log.lock().unwrap(), ["Service"]);
}

#[tokio::test]
async fn destroyed_container_rejects_lookups_and_registration() {
    let token = Token::new("Service");
    let root = Container::builder()
        .provide(&token, Provider::value(1u32))
        .build()
        .unwrap();

    root.destroy().await;
    assert!(root.is_destroyed());

    assert!(matches!(
        root.get::<u32>(&token),
        Err(DiError::Destroyed(_))
    ));
    assert!(root.resolve(&token, InjectFlags::DEFAULT).unwrap().is_none());
    assert!(matches!(
        root.set(&token, Provider::value(2u32)),
        Err(DiError::Destroyed(_))
    ));
}

#[tokio::test]
async fn destroying_a_child_leaves_the_parent_intact() {
    let shared = Token::new("Shared");
    let own = Token::new("Own");
    let log = Arc::new(Mutex::new(Vec::new()));

    let parent = Container::builder()
        .provide(&shared, tracked("parent", &log))
        .build()
        .unwrap();
    let child = Container::builder()
        .parent(&parent)
        .provide(&own, tracked("child", &log))
        .build()
        .unwrap();

    // Both instances live where their records live.
    child.get::<Tracked>(&shared).unwrap();
    child.get::<Tracked>(&own).unwrap();

    child.destroy().await;
    assert_eq!(*log.lock().unwrap(), ["child"]);

    assert!(parent.get::<Tracked>(&shared).is_ok());
    parent.destroy().await;
    assert_eq!(*log.lock().unwrap(), ["child", "parent"]);
}

#[tokio::test]
async fn transients_are_not_tracked_for_disposal() {
    let token = Token::new("Transient");
    let log = Arc::new(Mutex::new(Vec::new()));

    let root = Container::builder()
        .provide(&token, tracked("t", &log))
        .build()
        .unwrap();
    root.hooks()
        .register(&token, HookOptions::new().transient(|_| true))
        .unwrap();

    root.get::<Tracked>(&token).unwrap();
    root.get::<Tracked>(&token).unwrap();

    // Nothing cached means nothing owned: transient lifetimes belong to
    // their holders.
    root.destroy().await;
    assert!(log.lock().unwrap().is_empty());
}
