//! End-to-end module lifecycle through [`App`].

use std::sync::Arc;

use mosaic::{
	App, Arg, DeferredEvent, Document, Error, EventsMap, Handler, LibraryInstance, Methods, Module,
	ModuleMediator, ModuleState, Settings, Teardown,
};
use parking_lot::Mutex;
use rstest::{fixture, rstest};
use serde_json::json;

type Log = Arc<Mutex<Vec<String>>>;

struct Page {
	document: Document,
	app: App,
	log: Log,
}

impl Page {
	fn with_settings(markup: &str, settings: Settings) -> Self {
		let document = Document::new();
		document.body().set_html(markup);
		let app = App::with_settings(Arc::new(document.clone()), settings).unwrap();
		Self {
			document,
			app,
			log: Arc::new(Mutex::new(Vec::new())),
		}
	}

	fn first(&self, selector: &str) -> mosaic::Element {
		self.document.body().find(selector).unwrap().remove(0)
	}

	fn logger(&self, label: &'static str) -> impl Fn(&Module, &[Arg]) + Send + Sync + 'static {
		let log = Arc::clone(&self.log);
		move |module, _| log.lock().push(format!("{label} {}", module.module_type()))
	}

	fn entries(&self) -> Vec<String> {
		self.log.lock().clone()
	}
}

#[fixture]
fn page() -> Page {
	Page::with_settings(
		concat!(
			r#"<section id="list" data-list data-list-page-size="20">"#,
			r#"<ul><li>One</li><li>Two</li></ul>"#,
			r#"<div id="panel" data-panel></div>"#,
			r#"</section>"#,
			r#"<aside data-menu><button class="toggle">Menu</button></aside>"#,
		),
		Settings::default(),
	)
}

#[rstest]
fn test_initialize_builds_every_module(page: Page) {
	// Arrange
	page.app
		.define("list", Some(Methods::new().method("initialize", page.logger("initialize"))))
		.unwrap();
	page.app
		.define("panel", Some(Methods::new().method("run", page.logger("run"))))
		.unwrap();

	// Act
	page.app.initialize().unwrap();

	// Assert
	assert_eq!(page.entries(), vec!["initialize list", "run panel"]);
	let list = page.app.modules().instances("list").remove(0);
	assert_eq!(list.option("pageSize"), Some(json!(20)));
	assert_eq!(list.state(), ModuleState::Running);
}

#[rstest]
fn test_modules_talk_through_the_hub(page: Page) {
	// Arrange
	let log = Arc::clone(&page.log);
	page.app
		.define(
			"panel",
			Some(Methods::new().method("initialize", move |module, _| {
				let mediator = module.dependency::<ModuleMediator>("hub").unwrap();
				let log = Arc::clone(&log);
				mediator
					.subscribe(
						"list:select",
						Handler::new(move |args| {
							let item = args[0].as_str().unwrap_or_default().to_string();
							log.lock().push(format!("selected {item}"));
						}),
					)
					.unwrap();
			})),
		)
		.unwrap();
	page.app
		.define(
			"list",
			Some(Methods::new().events(EventsMap::new().handler("click li", |module, event| {
				let item = module.el().handle(event.current_target().unwrap()).text();
				module.publisher().unwrap().publish("list:select", vec![Arg::from(item)]);
			}))),
		)
		.unwrap();
	page.app.initialize().unwrap();

	// Act
	page.document.body().find("li").unwrap()[1].click();

	// Assert
	assert_eq!(page.entries(), vec!["selected Two"]);
}

#[rstest]
fn test_removing_markup_tears_down_subscriptions(page: Page) {
	// Arrange
	page.app
		.define(
			"panel",
			Some(Methods::new().method("initialize", |module, _| {
				module
					.dependency::<ModuleMediator>("hub")
					.unwrap()
					.subscribe("list:select", Handler::new(|_| {}))
					.unwrap();
			})),
		)
		.unwrap();
	page.app.initialize().unwrap();
	assert_eq!(page.app.hub().listener_count(Some("list:select")), 1);

	// Act
	page.first("#list").set_html("<p>Empty</p>");

	// Assert
	assert_eq!(page.app.hub().listener_count(Some("list:select")), 0);
	assert!(page.app.modules().instances("panel").is_empty());
}

#[rstest]
fn test_html_initializes_inserted_modules(page: Page) {
	// Arrange
	page.app.define("panel", None).unwrap();
	page.app
		.define("badge", Some(Methods::new().method("run", page.logger("run"))))
		.unwrap();
	page.app.initialize().unwrap();
	let panel = page.app.modules().instances("panel").remove(0);

	// Act
	panel.html(r#"<span data-badge data-badge-count="2"></span>"#);

	// Assert
	assert_eq!(page.entries(), vec!["run badge"]);
	let badge = page.app.modules().instances("badge").remove(0);
	assert_eq!(badge.option("count"), Some(json!(2)));
}

#[rstest]
fn test_html_reinitialization_can_be_disabled() {
	// Arrange
	let mut settings = Settings::default();
	settings.modules.reinitialize_on_html = false;
	let page = Page::with_settings(r#"<div data-panel></div>"#, settings);
	page.app.define("panel", None).unwrap();
	page.app.define("badge", None).unwrap();
	page.app.initialize().unwrap();

	// Act
	page.app.modules().instances("panel")[0].html(r#"<span data-badge></span>"#);

	// Assert
	assert!(page.app.modules().instances("badge").is_empty());
}

#[rstest]
fn test_deferred_module_with_sub_selector(page: Page) {
	// Arrange
	let menu = page
		.app
		.define("menu", Some(Methods::new().method("run", page.logger("run"))))
		.unwrap();
	menu.defer(DeferredEvent::new("click").with_selector(".toggle"))
		.unwrap();
	page.app.initialize().unwrap();

	// Act
	let outside = page.first("aside").click();
	let toggle = page.first(".toggle").click();

	// Assert
	assert!(!outside.default_prevented());
	assert!(toggle.default_prevented());
	assert_eq!(page.entries(), vec!["run menu"]);
}

#[rstest]
fn test_extend_registered_module(page: Page) {
	// Arrange
	page.app
		.define("base-panel", Some(Methods::new().method("run", page.logger("shared run"))))
		.unwrap();
	let panel = page.app.define("panel", None).unwrap();
	panel.extend("base-panel").unwrap();

	// Act
	page.app.initialize().unwrap();

	// Assert
	assert_eq!(page.entries(), vec!["shared run panel"]);
	let class = panel.build().unwrap();
	assert_eq!(class.name(), "PanelModule");
	assert_eq!(class.parent().unwrap().name(), "BasePanelModule");
}

#[rstest]
fn test_custom_library_dependency(page: Page) {
	// Arrange
	struct Store {
		torn_down: Mutex<bool>,
	}
	impl Teardown for Store {
		fn teardown(&self) {
			*self.torn_down.lock() = true;
		}
	}
	let store = Arc::new(Store {
		torn_down: Mutex::new(false),
	});
	let shared = Arc::clone(&store);
	page.app
		.libraries()
		.add("store", move || {
			LibraryInstance::builder_from_arc(Arc::clone(&shared))
				.teardown()
				.build()
		})
		.unwrap();
	let factory = page.app.define("panel", None).unwrap();
	factory.requires(["store"]);
	page.app.initialize().unwrap();
	let module = page.app.modules().instances("panel").remove(0);

	// Act
	let resolved = module.dependency::<Store>("store").unwrap();
	module.remove();

	// Assert
	assert!(Arc::ptr_eq(&resolved, &store));
	assert!(*store.torn_down.lock());
}

#[rstest]
fn test_unregistered_dependency_fails_initialize(page: Page) {
	let factory = page.app.define("panel", None).unwrap();
	factory.requires(["missing"]);

	let result = page.app.initialize();

	assert_eq!(result.err(), Some(Error::NotFound("missing".to_string())));
}

#[rstest]
fn test_settings_rename_hub_library() {
	// Arrange
	let settings = Settings::from_toml_str(
		r#"
		[hub]
		library_name = "bus"

		[modules]
		default_dependencies = ["bus"]
		"#,
	)
	.unwrap();
	let page = Page::with_settings(r#"<div data-panel></div>"#, settings);
	page.app.define("panel", None).unwrap();

	// Act
	page.app.initialize().unwrap();

	// Assert
	let module = page.app.modules().instances("panel").remove(0);
	assert!(module.dependency::<ModuleMediator>("bus").is_some());
	assert!(module.publisher().is_some());
}
