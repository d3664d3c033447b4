use autowire::assembler::{AssemblerBuilder, Overrides};
use autowire::component_registry::Registration;
use autowire::instance_provider::{InstancePtr, TypedInstanceProvider};
use autowire::{component_alias, injectable, Component};

#[injectable]
trait Mailer {
    fn send(&self, message: &str);
}

#[derive(Component)]
struct SmtpMailer;

#[component_alias]
impl Mailer for SmtpMailer {
    fn send(&self, message: &str) {
        println!("Sending via SMTP: {message}");
    }
}

#[derive(Component)]
struct ConsoleMailer;

#[component_alias]
impl Mailer for ConsoleMailer {
    fn send(&self, message: &str) {
        println!("Would send: {message}");
    }
}

#[derive(Component)]
struct Newsletter {
    mailer: InstancePtr<dyn Mailer + Send + Sync>,
}

fn main() {
    // components with profiles are eligible only when one of their profiles is active, while
    // components without profiles are always eligible
    let mut assembler = AssemblerBuilder::new()
        .register_component(
            Registration::component::<SmtpMailer>()
                .profiles(["prod"])
                .exposing::<dyn Mailer + Send + Sync, SmtpMailer>(),
        )
        .register_component(
            Registration::component::<ConsoleMailer>()
                .profiles(["dev", "test"])
                .exposing::<dyn Mailer + Send + Sync, ConsoleMailer>(),
        )
        .build()
        .expect("error registering components");

    // prints "Sending via SMTP: hello"
    assembler
        .assemble_for_profile::<Newsletter>("prod")
        .expect("error assembling Newsletter")
        .mailer
        .send("hello");

    // prints "Would send: hello"
    assembler
        .assemble_for_profile::<Newsletter>("dev")
        .expect("error assembling Newsletter")
        .mailer
        .send("hello");

    // no mailer is eligible without a profile, so assembly fails
    assert!(assembler.assemble::<Newsletter>().is_err());

    // explicit arguments take precedence over anything registered
    let mailer: InstancePtr<dyn Mailer + Send + Sync> = InstancePtr::new(ConsoleMailer);
    assembler
        .assemble_with::<Newsletter>(None, Overrides::new().instance("mailer", mailer))
        .expect("error assembling Newsletter")
        .mailer
        .send("overridden");
}
