use switchboard::{
    Command, EventSelector, ListenDirection, ListenerSpec, LoadError, Priority, Switchboard,
    testing::{Recorder, ScriptedModule, recording_command, recording_listener},
};

mod common;
use common::catalog;

fn listening(name: &str) -> ScriptedModule {
    let seen = Recorder::new();
    let calls = Recorder::new();
    ScriptedModule::new(name)
        .command(Command::new(format!("{name}-info"), recording_command(&calls)))
        .admin_command(Command::new("rehash", recording_command(&calls)).global())
        .listener(ListenerSpec::on("pubmsg", recording_listener(&seen)))
        .listener(
            ListenerSpec::on(EventSelector::All, recording_listener(&seen))
                .direction(ListenDirection::Both)
                .priority(Priority::LOW)
                .inline(),
        )
}

#[test]
fn distinct_modules_load_and_a_duplicate_name_is_rejected() {
    let mut catalog = catalog(vec![listening("alpha"), listening("beta")]);
    catalog.register_module("alpha-again", || listening("alpha"));
    let bot = Switchboard::builder()
        .catalog(catalog)
        .without_builtins()
        .build();

    bot.registry().load("alpha").unwrap();
    bot.registry().load("beta").unwrap();
    let index = bot.registry().listener_index();
    let admin = bot.registry().global_admin_table();

    let err = bot.registry().load("alpha-again").unwrap_err();
    assert!(matches!(err, LoadError::DuplicateModule { .. }));
    assert_eq!(bot.registry().module_names(), ["alpha", "beta"]);
    assert_eq!(*bot.registry().listener_index(), *index);
    assert_eq!(bot.registry().global_admin_table(), admin);
    assert_eq!(bot.registry().identifiers(), ["alpha", "beta"]);
}

#[test]
fn load_then_unload_leaves_no_residue() {
    let bot = Switchboard::builder()
        .catalog(catalog(vec![listening("alpha"), listening("beta")]))
        .without_builtins()
        .build();

    let empty_index = bot.registry().listener_index();
    bot.registry().load("alpha").unwrap();
    let after_alpha = bot.registry().listener_index();
    let admin_after_alpha = bot.registry().global_admin_table();

    bot.registry().load("beta").unwrap();
    bot.registry().unload("beta").unwrap();
    assert_eq!(*bot.registry().listener_index(), *after_alpha);
    assert_eq!(bot.registry().global_admin_table(), admin_after_alpha);

    bot.registry().unload("alpha").unwrap();
    assert_eq!(*bot.registry().listener_index(), *empty_index);
    assert!(bot.registry().listener_index().shape().is_empty());
    assert!(bot.registry().global_admin_table().is_empty());
}

#[test]
fn unload_of_unknown_identifier_is_reported() {
    let bot = Switchboard::builder()
        .catalog(catalog(vec![listening("alpha")]))
        .build();
    bot.load_init();
    let names = bot.registry().module_names();

    assert!(matches!(
        bot.registry().unload("nothing"),
        Err(LoadError::NotLoaded(_))
    ));
    assert_eq!(bot.registry().module_names(), names);
}

#[test]
fn builtins_are_available_and_core_is_reported() {
    let bot = Switchboard::builder()
        .catalog(catalog(vec![listening("alpha")]))
        .build();
    assert_eq!(bot.registry().available(), ["alpha", "log", "modules"]);

    let report = bot.load_init();
    assert_eq!(report.core, ["modules"]);
    assert_eq!(bot.registry().module_names(), ["alpha", "log", "modules"]);
    assert!(bot.registry().available().is_empty());

    let info = bot.registry().module_info("modules").unwrap();
    assert!(info.is_core);
    assert_eq!(info.commands.keys().collect::<Vec<_>>(), ["json", "module"]);
    assert_eq!(info.admin_commands, ["list"]);
}
