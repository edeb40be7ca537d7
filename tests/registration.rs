use strata_di::{Container, ContainerOptions, DiError, Provider, Token};

#[test]
fn rebinding_before_first_resolution_replaces() {
    let token = Token::new("Answer");
    let root = Container::builder()
        .provide(&token, Provider::value(42u32))
        .build()
        .unwrap();

    assert!(root.set(&token, Provider::value(7u32)).unwrap());
    assert_eq!(*root.get::<u32>(&token).unwrap(), 7);
}

#[test]
fn rebinding_after_resolution_is_rejected() {
    let token = Token::new("Answer");
    let root = Container::builder()
        .provide(&token, Provider::value(42u32))
        .build()
        .unwrap();

    assert_eq!(*root.get::<u32>(&token).unwrap(), 42);
    match root.set(&token, Provider::value(7u32)) {
        Err(DiError::AlreadyInstantiated(name)) => assert_eq!(name, "Answer"),
        other => panic!("expected AlreadyInstantiated, got {:?}", other),
    }
    // The cached instance is untouched.
    assert_eq!(*root.get::<u32>(&token).unwrap(), 42);
}

#[test]
fn late_registration_on_a_live_container() {
    let token = Token::new("Late");
    let root = Container::builder().build().unwrap();

    assert!(root.set(&token, Provider::value(3u32)).unwrap());
    assert_eq!(*root.get::<u32>(&token).unwrap(), 3);
}

#[test]
fn multi_and_single_forms_do_not_mix() {
    let token = Token::new("Mixed");
    let root = Container::builder()
        .provide(&token, Provider::value(1u32).multi())
        .build()
        .unwrap();

    assert!(matches!(
        root.set(&token, Provider::value(2u32)),
        Err(DiError::InvalidProvider(_))
    ));

    let single = Token::new("Single");
    root.set(&single, Provider::value(1u32)).unwrap();
    assert!(matches!(
        root.set(&single, Provider::value(2u32).multi()),
        Err(DiError::InvalidProvider(_))
    ));
}

#[test]
fn strict_multi_rejects_contributions_after_resolution() {
    let token = Token::new("Plugins");
    let root = Container::builder()
        .provide(&token, Provider::value(1u32).multi())
        .build()
        .unwrap();

    // Contributing is fine while the list is unresolved.
    assert!(root.set(&token, Provider::value(2u32).multi()).unwrap());
    assert_eq!(root.get_all::<u32>(&token).unwrap().len(), 2);

    assert!(matches!(
        root.set(&token, Provider::value(3u32).multi()),
        Err(DiError::MultiAfterResolution(_))
    ));
}

#[test]
fn lenient_multi_ignores_contributions_after_resolution() {
    let token = Token::new("Plugins");
    let root = Container::builder()
        .options(ContainerOptions {
            strict_multi_injection: false,
            ..ContainerOptions::default()
        })
        .provide(&token, Provider::value(1u32).multi())
        .build()
        .unwrap();

    assert_eq!(root.get_all::<u32>(&token).unwrap().len(), 1);

    // Ignored, not an error.
    assert!(!root.set(&token, Provider::value(2u32).multi()).unwrap());
    assert_eq!(root.get_all::<u32>(&token).unwrap().len(), 1);
}
