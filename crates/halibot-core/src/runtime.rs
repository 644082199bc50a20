//! The Halibot runtime: registry, dispatcher, and permission engine in one place.
//!
//! Transports and plugin loaders construct actors with handles obtained from
//! the runtime (`dispatcher()` for agents, `auth()` for modules) and then hand
//! them back through `add_agent_instance` / `add_module_instance`.
//!
//! Registration is synchronous. Mailbox workers run on the tokio runtime
//! captured when the `Halibot` was built, the one set with `with_runtime`, or
//! the one current at registration time, in that order.

use std::sync::Arc;

use halibot_types::config::{AgentConfig, RuntimeConfig};
use halibot_types::error::RegistrationError;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::actor::{Actor, ActorDyn, ActorKind, ActorRef};
use crate::auth::{BoxPermissionStore, PermissionEngine};
use crate::dispatch::{Dispatcher, spawn_worker};
use crate::registry::Registry;

/// A running bot: every registered actor plus the shared permission engine.
///
/// Dropping the runtime stops all mailbox workers.
pub struct Halibot {
    config: RuntimeConfig,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    auth: Arc<PermissionEngine>,
    cancel: CancellationToken,
    runtime: Option<Handle>,
}

impl Halibot {
    /// Create a runtime with default configuration (enforcement off).
    pub fn new(store: BoxPermissionStore) -> Self {
        let registry = Arc::new(Registry::new());
        Self {
            config: RuntimeConfig::default(),
            dispatcher: Dispatcher::new(&registry),
            registry,
            auth: Arc::new(PermissionEngine::new(store)),
            cancel: CancellationToken::new(),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Create a runtime whose engine takes its flag and store path from `config.auth`.
    pub fn from_config(config: RuntimeConfig, store: BoxPermissionStore) -> Self {
        let registry = Arc::new(Registry::new());
        let auth = PermissionEngine::with_config(&config.auth, store);
        Self {
            dispatcher: Dispatcher::new(&registry),
            registry,
            auth: Arc::new(auth),
            cancel: CancellationToken::new(),
            runtime: Handle::try_current().ok(),
            config,
        }
    }

    /// Run mailbox workers on `runtime`, so actors can be added from threads
    /// that are not inside it.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Load persisted grants when enforcement is configured on.
    ///
    /// With enforcement off the store is left alone, so a missing grant file
    /// does not force enforcement on.
    pub async fn start(&self) {
        if self.config.auth.enabled {
            self.auth.load_perms(&self.config.auth.perms_file).await;
        }
        info!(
            enforcing = self.auth.is_enabled(),
            grants = self.auth.perms().len(),
            "halibot runtime started"
        );
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Configured links for the agent registered as `name`, or empty links.
    pub fn agent_config(&self, name: &str) -> AgentConfig {
        self.config.agents.get(name).cloned().unwrap_or_default()
    }

    pub fn auth(&self) -> &Arc<PermissionEngine> {
        &self.auth
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start the actor's mailbox, run its `init`, and register it under `name`.
    ///
    /// Registering a second actor under an existing name replaces the first.
    /// Fails without side effects when no tokio runtime is available.
    pub fn add_instance<A: Actor>(
        &self,
        name: impl Into<String>,
        kind: ActorKind,
        actor: Arc<A>,
    ) -> Result<ActorRef, RegistrationError> {
        let name = name.into();
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!(actor = %name, "no async runtime available, actor not registered");
            return Err(RegistrationError::NoAsyncRuntime(name));
        };

        let actor: Arc<dyn ActorDyn> = actor;
        let mailbox = spawn_worker(
            &runtime,
            name.clone(),
            Arc::clone(&actor),
            self.cancel.child_token(),
        );
        let handle = ActorRef::new(name, kind, actor, mailbox);

        handle.actor().init_dyn();
        if self.registry.register(handle.clone()).is_some() {
            warn!(actor = %handle.name(), "replaced previously registered actor");
        }
        info!(actor = %handle.name(), kind = ?kind, "registered actor");
        Ok(handle)
    }

    pub fn add_agent_instance<A: Actor>(
        &self,
        name: impl Into<String>,
        actor: Arc<A>,
    ) -> Result<ActorRef, RegistrationError> {
        self.add_instance(name, ActorKind::Agent, actor)
    }

    pub fn add_module_instance<A: Actor>(
        &self,
        name: impl Into<String>,
        actor: Arc<A>,
    ) -> Result<ActorRef, RegistrationError> {
        self.add_instance(name, ActorKind::Module, actor)
    }

    /// Look up a registered agent or module by name.
    pub fn get_object(&self, name: &str) -> Option<ActorRef> {
        self.registry.lookup(name)
    }

    pub fn object_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Run every actor's `shutdown` hook, then stop all mailbox workers.
    pub fn shutdown(&self) {
        for name in self.registry.names() {
            if let Some(actor) = self.registry.lookup(&name) {
                actor.actor().shutdown_dyn();
            }
        }
        self.cancel.cancel();
        info!("halibot runtime shut down");
    }
}

impl Drop for Halibot {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Halibot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Halibot")
            .field("actors", &self.registry.len())
            .field("enforcing", &self.auth.is_enabled())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use halibot_types::config::AuthConfig;
    use halibot_types::error::ActorError;
    use halibot_types::message::{Authorizable, Message};
    use halibot_types::permission::Grant;

    use crate::actor::{Agent, Module, Router};
    use crate::auth::{HandlerArgs, MemoryPermissionStore, PermissionGate};

    fn bot() -> Halibot {
        Halibot::new(BoxPermissionStore::new(MemoryPermissionStore::new()))
    }

    #[derive(Default)]
    struct StubModule {
        inited: AtomicBool,
        shut_down: AtomicBool,
        received: Mutex<Vec<Message>>,
    }

    impl StubModule {
        fn received(&self) -> Vec<Message> {
            self.received.lock().unwrap().clone()
        }
    }

    impl Actor for StubModule {
        fn init(&self) {
            self.inited.store(true, Ordering::SeqCst);
        }

        async fn receive(&self, msg: &Message) -> Result<(), ActorError> {
            self.received.lock().unwrap().push(msg.clone());
            Ok(())
        }

        fn shutdown(&self) {
            self.shut_down.store(true, Ordering::SeqCst);
        }
    }

    struct StubAgent {
        router: Router,
        inited: AtomicBool,
    }

    impl StubAgent {
        fn new(bot: &Halibot, name: &str) -> Self {
            Self {
                router: Router::new(bot.dispatcher().clone(), bot.agent_config(name)),
                inited: AtomicBool::new(false),
            }
        }
    }

    impl Actor for StubAgent {
        fn init(&self) {
            self.inited.store(true, Ordering::SeqCst);
        }

        async fn receive(&self, _msg: &Message) -> Result<(), ActorError> {
            Ok(())
        }
    }

    impl Agent for StubAgent {
        fn router(&self) -> &Router {
            &self.router
        }
    }

    /// Module that checks the permission explicitly inside `receive`.
    struct ExplicitCheck {
        auth: Arc<PermissionEngine>,
        called: AtomicBool,
    }

    impl Actor for ExplicitCheck {
        async fn receive(&self, msg: &Message) -> Result<(), ActorError> {
            if self.has_permission(msg, "Foo")? {
                self.called.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    impl Module for ExplicitCheck {
        fn auth(&self) -> &PermissionEngine {
            &self.auth
        }
    }

    /// Module whose handler is wrapped in a reply-enabled gate on argument 0.
    struct GatedHandler {
        auth: Arc<PermissionEngine>,
        called: AtomicBool,
        denials: AtomicUsize,
    }

    impl GatedHandler {
        fn function(&self, msg: &Message) -> Result<Option<()>, ActorError> {
            let args = HandlerArgs::new().arg(msg);
            Ok(PermissionGate::at("Foo", 0)
                .with_reply(true)
                .run(self, &args, |_| self.called.store(true, Ordering::SeqCst))?)
        }
    }

    impl Actor for GatedHandler {
        async fn receive(&self, msg: &Message) -> Result<(), ActorError> {
            self.function(msg).map(|_| ())
        }
    }

    impl Module for GatedHandler {
        fn auth(&self) -> &PermissionEngine {
            &self.auth
        }

        fn reply_denied(&self, _msg: &dyn Authorizable, _permission: &str) {
            self.denials.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn wait_for_count(module: &StubModule, n: usize) {
        for _ in 0..1000 {
            if module.received.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn add_module_runs_init_and_registers() {
        let bot = bot();
        let stub = Arc::new(StubModule::default());
        let handle = bot.add_module_instance("stub_mod", stub.clone()).unwrap();

        assert!(stub.inited.load(Ordering::SeqCst));
        assert_eq!(handle.kind(), ActorKind::Module);
        assert!(bot.get_object("stub_mod").unwrap().is(&stub));
    }

    #[tokio::test]
    async fn add_agent_runs_init_and_registers() {
        let bot = bot();
        let stub = Arc::new(StubAgent::new(&bot, "stub_agent"));
        let handle = bot.add_agent_instance("stub_agent", stub.clone()).unwrap();

        assert!(stub.inited.load(Ordering::SeqCst));
        assert_eq!(handle.kind(), ActorKind::Agent);
        assert!(bot.get_object("stub_agent").unwrap().is(&stub));
        assert_eq!(bot.object_names(), vec!["stub_agent".to_string()]);
    }

    #[tokio::test]
    async fn send_recv_preserves_order() {
        let bot = bot();
        let agent = Arc::new(StubAgent::new(&bot, "stub_agent"));
        let module = Arc::new(StubModule::default());
        bot.add_agent_instance("stub_agent", agent.clone()).unwrap();
        let module_ref = bot.add_module_instance("stub_mod", module.clone()).unwrap();

        let foo = Message::new("foo");
        let bar = Message::new("bar");
        let baz = Message::new("baz");

        agent.connect(&module_ref);
        assert_eq!(agent.send(foo.clone()), 1);
        assert_eq!(agent.send_to(bar.clone(), &["stub_mod"]), 1);
        assert_eq!(agent.send(baz.clone()), 1);

        wait_for_count(&module, 3).await;
        assert_eq!(module.received(), vec![foo, bar, baz]);
    }

    #[tokio::test]
    async fn dispatch_merges_default_and_named_links() {
        let mut config = RuntimeConfig::default();
        let mut agent_config = AgentConfig {
            name: Some("relay".to_string()),
            ..AgentConfig::default()
        };
        agent_config.out.default.push("sink".to_string());
        agent_config
            .out
            .named
            .insert("relay".to_string(), vec!["sink".to_string(), "ghost".to_string()]);
        config.agents.insert("relay_agent".to_string(), agent_config);

        let bot = Halibot::from_config(config, BoxPermissionStore::new(MemoryPermissionStore::new()));
        let agent = Arc::new(StubAgent::new(&bot, "relay_agent"));
        let sink = Arc::new(StubModule::default());
        bot.add_agent_instance("relay_agent", agent.clone()).unwrap();
        bot.add_module_instance("sink", sink.clone()).unwrap();

        assert_eq!(agent.router().links(), vec!["sink", "sink", "ghost"]);
        assert_eq!(agent.dispatch(Message::new("twice")), 2);

        wait_for_count(&sink, 2).await;
        assert_eq!(sink.received().len(), 2);
    }

    #[tokio::test]
    async fn send_to_unstarted_actor_is_not_an_error() {
        let bot = bot();
        let agent = Arc::new(StubAgent::new(&bot, "lonely"));
        bot.add_agent_instance("lonely", agent.clone()).unwrap();

        agent.router().connect("not_started_yet");
        assert_eq!(agent.send(Message::new("hello?")), 0);
    }

    #[tokio::test]
    async fn explicit_permission_check() {
        let bot = bot();
        bot.auth().set_enabled(true);
        let stub = Arc::new(ExplicitCheck {
            auth: Arc::clone(bot.auth()),
            called: AtomicBool::new(false),
        });
        bot.add_module_instance("stub_mod", stub.clone()).unwrap();

        let msg = Message::from_principal("", "test/foobar", "tester");

        stub.receive(&msg).await.unwrap();
        assert!(!stub.called.swap(false, Ordering::SeqCst));

        bot.auth().grant_permission("test/foobar", "tester", "Foo");
        stub.receive(&msg).await.unwrap();
        assert!(stub.called.swap(false, Ordering::SeqCst));

        bot.auth().revoke_permission("test/foobar", "tester", "Foo");
        stub.receive(&msg).await.unwrap();
        assert!(!stub.called.swap(false, Ordering::SeqCst));

        bot.auth().set_enabled(false);
        bot.auth().revoke_permission("test/foobar", "tester", "Foo");
        stub.receive(&msg).await.unwrap();
        assert!(stub.called.swap(false, Ordering::SeqCst));
    }

    #[tokio::test]
    async fn gated_handler_follows_grants() {
        let bot = bot();
        bot.auth().set_enabled(true);
        let stub = Arc::new(GatedHandler {
            auth: Arc::clone(bot.auth()),
            called: AtomicBool::new(false),
            denials: AtomicUsize::new(0),
        });
        let handle = bot.add_module_instance("stub_mod", stub.clone()).unwrap();

        let msg = Message::from_principal("", "test/foobar", "tester");

        handle.receive(&msg).await.unwrap();
        assert!(!stub.called.swap(false, Ordering::SeqCst));
        assert_eq!(stub.denials.load(Ordering::SeqCst), 1);

        bot.auth().grant_permission("test/foobar", "tester", "Foo");
        handle.receive(&msg).await.unwrap();
        assert!(stub.called.swap(false, Ordering::SeqCst));

        bot.auth().revoke_permission("test/foobar", "tester", "Foo");
        handle.receive(&msg).await.unwrap();
        assert!(!stub.called.swap(false, Ordering::SeqCst));
    }

    #[tokio::test]
    async fn gated_handler_rejects_malformed_message() {
        let bot = bot();
        bot.auth().set_enabled(true);
        let stub = Arc::new(GatedHandler {
            auth: Arc::clone(bot.auth()),
            called: AtomicBool::new(false),
            denials: AtomicUsize::new(0),
        });
        bot.add_module_instance("stub_mod", stub.clone()).unwrap();

        let bad = Message::from_principal("", "", "tester");
        let err = stub.receive(&bad).await.unwrap_err();
        assert!(matches!(
            err,
            ActorError::Auth(halibot_types::error::AuthError::MalformedMessage(_))
        ));
        assert!(!stub.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn wildcard_grant_through_runtime() {
        let bot = bot();
        bot.auth().set_enabled(true);
        let stub = Arc::new(GatedHandler {
            auth: Arc::clone(bot.auth()),
            called: AtomicBool::new(false),
            denials: AtomicUsize::new(0),
        });

        bot.auth().grant_permission(".*", "tester", ".*");
        stub.receive(&Message::from_principal("", "test/foobar", "tester"))
            .await
            .unwrap();
        assert!(stub.called.load(Ordering::SeqCst));
    }

    #[test]
    fn add_without_runtime_is_an_error() {
        let bot = bot();
        let stub = Arc::new(StubModule::default());

        let err = bot.add_module_instance("noop", stub.clone()).unwrap_err();
        assert!(matches!(err, RegistrationError::NoAsyncRuntime(ref name) if name == "noop"));
        assert!(!stub.inited.load(Ordering::SeqCst));
        assert!(bot.get_object("noop").is_none());
    }

    #[test]
    fn with_runtime_registers_from_plain_thread() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let bot = bot().with_runtime(rt.handle().clone());
        let agent = Arc::new(StubAgent::new(&bot, "a"));
        let module = Arc::new(StubModule::default());

        bot.add_agent_instance("a", agent.clone()).unwrap();
        let module_ref = bot.add_module_instance("m", module.clone()).unwrap();
        agent.connect(&module_ref);
        assert!(module.inited.load(Ordering::SeqCst));

        assert_eq!(agent.send(Message::new("hi")), 1);
        rt.block_on(wait_for_count(&module, 1));
        assert_eq!(module.received().len(), 1);
    }

    #[test]
    fn runtime_captured_at_construction_outlives_the_block() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let bot = rt.block_on(async { bot() });
        let module = Arc::new(StubModule::default());

        let module_ref = bot.add_module_instance("m", module.clone()).unwrap();
        assert!(module_ref.mailbox().deliver(Arc::new(Message::new("late"))));
        rt.block_on(wait_for_count(&module, 1));
        assert_eq!(module.received().len(), 1);
    }

    #[tokio::test]
    async fn start_loads_configured_store_when_enforcing() {
        let store = MemoryPermissionStore::new();
        store.insert_raw("perms.json", r#"[["irc/.*", "admin", ".*"]]"#);
        let config = RuntimeConfig {
            auth: AuthConfig {
                enabled: true,
                perms_file: PathBuf::from("perms.json"),
            },
            ..RuntimeConfig::default()
        };

        let bot = Halibot::from_config(config, BoxPermissionStore::new(store));
        bot.start().await;

        assert!(bot.auth().is_enabled());
        assert_eq!(bot.auth().perms(), vec![Grant::new("irc/.*", "admin", ".*")]);
    }

    #[tokio::test]
    async fn start_skips_store_when_not_enforcing() {
        let bot = bot();
        bot.start().await;
        assert!(!bot.auth().is_enabled());
    }

    #[tokio::test]
    async fn shutdown_runs_hooks_and_stops_delivery() {
        let bot = bot();
        let agent = Arc::new(StubAgent::new(&bot, "a"));
        let module = Arc::new(StubModule::default());
        bot.add_agent_instance("a", agent.clone()).unwrap();
        let module_ref = bot.add_module_instance("m", module.clone()).unwrap();
        agent.connect(&module_ref);

        bot.shutdown();
        assert!(module.shut_down.load(Ordering::SeqCst));

        for _ in 0..500 {
            if agent.send(Message::new("late")) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(agent.send(Message::new("late")), 0);
    }
}
