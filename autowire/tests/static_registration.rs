#[cfg(feature = "derive")]
mod static_registration_test {
    use autowire::assembler::AssemblerBuilder;
    use autowire::component_registry::ComponentRegistry;
    use autowire::descriptor::TypeKey;
    use autowire::instance_provider::{InstancePtr, TypedInstanceProvider};
    use autowire::{component_alias, injectable, Component};

    #[injectable]
    trait Notifier {
        fn channel(&self) -> &'static str;
    }

    #[derive(Component)]
    #[component]
    struct EmailNotifier;

    #[component_alias]
    impl Notifier for EmailNotifier {
        fn channel(&self) -> &'static str {
            "email"
        }
    }

    #[derive(Component)]
    #[component(profiles = ["dev", "test"], priority = -5)]
    struct ConsoleNotifier;

    #[component_alias]
    impl Notifier for ConsoleNotifier {
        fn channel(&self) -> &'static str {
            "console"
        }
    }

    #[derive(Component)]
    #[component(singleton = false, priority = 10)]
    struct Dispatcher {
        notifiers: Vec<InstancePtr<dyn Notifier + Send + Sync>>,
    }

    // not statically registered, so its alias is skipped
    #[derive(Component)]
    struct SmsNotifier;

    #[component_alias]
    impl Notifier for SmsNotifier {
        fn channel(&self) -> &'static str {
            "sms"
        }
    }

    #[test]
    fn should_order_static_registrations() {
        let keys = ComponentRegistry::static_registrations()
            .iter()
            .map(|registration| registration.key())
            .collect::<Vec<_>>();

        assert_eq!(
            keys,
            vec![
                TypeKey::of::<Dispatcher>(),
                TypeKey::of::<EmailNotifier>(),
                TypeKey::of::<ConsoleNotifier>(),
            ]
        );
    }

    #[test]
    fn should_attach_aliases() {
        let registry = ComponentRegistry::from_static().unwrap();
        let notifier = TypeKey::of::<dyn Notifier + Send + Sync>();

        assert_eq!(registry.lookup_all(notifier, None).len(), 1);
        assert_eq!(registry.lookup_all(notifier, Some("dev")).len(), 2);
        assert!(registry
            .iter()
            .all(|component| component.key() != TypeKey::of::<SmsNotifier>()));
    }

    #[test]
    fn should_assemble_static_components() {
        let mut assembler = AssemblerBuilder::new()
            .with_static_components()
            .build()
            .unwrap();

        let channels = |dispatcher: InstancePtr<Dispatcher>| {
            dispatcher
                .notifiers
                .iter()
                .map(|notifier| notifier.channel())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            channels(assembler.assemble::<Dispatcher>().unwrap()),
            vec!["email"]
        );
        assert_eq!(
            channels(assembler.assemble_for_profile::<Dispatcher>("test").unwrap()),
            vec!["email", "console"]
        );

        let first = assembler.assemble::<Dispatcher>().unwrap();
        let second = assembler.assemble::<Dispatcher>().unwrap();
        assert!(!InstancePtr::ptr_eq(&first, &second));
        assert!(InstancePtr::ptr_eq(&first.notifiers[0], &second.notifiers[0]));

        // unregistered components can still be assembled directly
        assert_eq!(assembler.assemble::<SmsNotifier>().unwrap().channel(), "sms");
    }
}
