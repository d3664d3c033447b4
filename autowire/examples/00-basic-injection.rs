use autowire::assembler::AssemblerBuilder;
use autowire::component_registry::Registration;
use autowire::instance_provider::{InstancePtr, TypedInstanceProvider};
use autowire::{component_alias, injectable, Component};

// this is a trait we would like to use in our component
#[injectable]
trait TestTrait {
    fn foo(&self);
}

// this is a dependency which implements the above trait and also is an injectable component
#[derive(Component)]
struct TestDependency;

// we're telling the assembler TestDependency can be provided when asked for dyn TestTrait
#[component_alias]
impl TestTrait for TestDependency {
    fn foo(&self) {
        println!("Hello world!");
    }
}

// this is another component, but with a dependency
#[derive(Component)]
struct TestComponent {
    // the assembler will inject the registered dyn TestTrait implementation
    dependency: InstancePtr<dyn TestTrait + Send + Sync>,
    // alternatively, you can inject the concrete type
    // dependency: InstancePtr<TestDependency>,
}

impl TestComponent {
    fn call_foo(&self) {
        self.dependency.foo();
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // dependencies need to be registered - the concrete type is always exposed, while traits need
    // to be exposed explicitly
    let mut assembler = AssemblerBuilder::new()
        .register_component(
            Registration::component::<TestDependency>()
                .exposing::<dyn TestTrait + Send + Sync, TestDependency>(),
        )
        .build()
        .expect("error registering components");

    // the requested component itself doesn't need to be registered
    let component = assembler
        .assemble::<TestComponent>()
        .expect("error assembling TestComponent");

    // prints "Hello world!"
    component.call_foo();
}
