use autowire::{Container, Handle, Iterable, Many, Obj, OneOf};
use tracing::info;
use tracing_subscriber::EnvFilter;

trait Notifier {
    fn send(&self, to: &str, message: &str) -> String;
}

struct Smtp {
    host: String,
}

impl Notifier for Smtp {
    fn send(&self, to: &str, message: &str) -> String {
        format!("[{}] {} <- {}", self.host, to, message)
    }
}

struct Sms;

impl Notifier for Sms {
    fn send(&self, to: &str, message: &str) -> String {
        format!("[sms] {} <- {}", to, message)
    }
}

struct Users {
    names: Vec<String>,
}

struct Onboarding {
    users: Handle<Users>,
    notifier: Handle<dyn Notifier>,
}

impl Onboarding {
    fn welcome_all(&self) -> Vec<String> {
        self.users
            .names
            .iter()
            .map(|name| self.notifier.send(name, "welcome"))
            .collect()
    }
}

// A parent and its child referring to each other.
struct Parent {
    child: Handle<Child>,
}

struct Child {
    parent: Handle<Parent>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let container = Container::new();
    container
        .declare::<Smtp>()
        .implements::<dyn Notifier>(|smtp| smtp)
        .and_then(|_| container.declare::<Sms>().implements::<dyn Notifier>(|sms| sms))
        .expect("Failed to declare notifiers");

    container
        .register_singleton_factory(|| Smtp {
            host: "mail.local".into(),
        })
        .expect("Failed to register smtp");
    container
        .register_factory_of(|| Many::new(vec![Obj::new(Sms)]))
        .expect("Failed to register sms");
    container
        .register_instance(Users {
            names: vec!["ada".into(), "grace".into()],
        })
        .expect("Failed to register users");
    container
        .register_class(|users: Handle<Users>, notifier: Handle<dyn Notifier>| Onboarding {
            users,
            notifier,
        })
        .expect("Failed to register onboarding");
    container
        .register_class(|child: Handle<Child>| Parent { child })
        .expect("Failed to register parent");
    container
        .register_class(|parent: Handle<Parent>| Child { parent })
        .expect("Failed to register child");

    let onboarding = container.resolve::<Handle<Onboarding>>();
    for line in onboarding.welcome_all() {
        info!("{}", line);
    }

    for notifier in container.resolve::<Iterable<Handle<dyn Notifier>>>() {
        info!("{}", notifier.send("ops", "deploy finished"));
    }

    match container.resolve::<OneOf<Handle<Sms>, Handle<Smtp>>>() {
        OneOf::First(_) => info!("Preferred transport: sms"),
        OneOf::Second(smtp) => info!("Preferred transport: smtp via {}", smtp.host),
    }

    let parent = container.resolve::<Handle<Parent>>();
    let back = &parent.child.parent;
    info!(
        "Cycle closed through a proxy: {} (same parent: {})",
        back.is_proxy(),
        back.shared().is_ok_and(|shared| parent
            .shared()
            .is_ok_and(|own| std::rc::Rc::ptr_eq(&shared, &own)))
    );

    println!("Resolved {} providers", container.len());
}
