use autowire::assembler::AssemblerBuilder;
use autowire::factory_registry::FactoryRegistration;
use autowire::instance_provider::{ErrorPtr, InstancePtr, TypedInstanceProvider};
use autowire::{injectable, Component};
use std::sync::atomic::{AtomicU32, Ordering};

#[injectable]
trait IdGenerator {
    fn next(&self) -> u32;
}

// a type we can't or don't want to derive Component for
struct SequentialIdGenerator {
    next: AtomicU32,
}

impl IdGenerator for SequentialIdGenerator {
    fn next(&self) -> u32 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

#[derive(Component)]
struct Clock;

#[derive(Component)]
struct OrderService {
    ids: InstancePtr<dyn IdGenerator + Send + Sync>,
}

fn main() {
    // factories provide instances of their return types - singleton factories are called once,
    // while prototype factories are called on every injection
    let mut assembler = AssemblerBuilder::new()
        .register_factory(FactoryRegistration::new(|| {
            InstancePtr::new(SequentialIdGenerator {
                next: AtomicU32::new(1),
            }) as InstancePtr<dyn IdGenerator + Send + Sync>
        }))
        // fallible factories report errors when assembling
        .register_factory(
            FactoryRegistration::try_new(|| -> Result<InstancePtr<Clock>, ErrorPtr> {
                Ok(InstancePtr::new(Clock))
            })
            .singleton(false),
        )
        .build()
        .expect("error registering factories");

    let first = assembler
        .assemble::<OrderService>()
        .expect("error assembling OrderService");
    let second = assembler
        .assemble::<OrderService>()
        .expect("error assembling OrderService");

    // prints "1 2" - both services share the generator
    println!("{} {}", first.ids.next(), second.ids.next());

    let first = assembler.assemble::<Clock>().expect("error assembling Clock");
    let second = assembler.assemble::<Clock>().expect("error assembling Clock");
    println!("Same clock: {}", InstancePtr::ptr_eq(&first, &second));
}
