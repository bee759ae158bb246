use switchboard::{
    Command, CommandHandler, Event, EventSelector, ListenDirection, ListenerHandler, ListenerSpec,
    Priority, UserLevel,
    testing::{MockServer, Recorder, ScriptedModule, pubmsg, recording_command, recording_listener},
};

mod common;
use common::{ADMIN, REGULAR, WAIT, engine};

fn stamp(tag: &'static str) -> ListenerHandler {
    ListenerHandler::new(move |mut event: Event| async move {
        event.arguments.push(tag.to_string());
        Ok(Some(event))
    })
}

#[tokio::test]
async fn listeners_run_by_priority_and_see_inline_changes() {
    let observed = Recorder::new();
    let module = ScriptedModule::new("order")
        .listener(ListenerSpec::on("pubmsg", stamp("first")).priority(Priority(-10)).inline())
        .listener(ListenerSpec::on("pubmsg", recording_listener(&observed)).priority(Priority(0)).inline())
        .listener(ListenerSpec::on("pubmsg", stamp("last")).priority(Priority(10)).inline());
    let bot = engine(vec![module]);
    let server = MockServer::new("testnet");

    let out = bot.dispatch(pubmsg(&server, "#chan", REGULAR, "hello")).await;

    assert_eq!(observed.items()[0].arguments, ["hello", "first"]);
    assert_eq!(out.arguments, ["hello", "first", "last"]);
}

#[tokio::test]
async fn a_handler_bound_broadly_and_specifically_runs_once() {
    let seen = Recorder::new();
    let handler = recording_listener(&seen);
    let module = ScriptedModule::new("dedup")
        .listener(
            ListenerSpec::on(EventSelector::All, handler.clone()).direction(ListenDirection::Both),
        )
        .listener(ListenerSpec::on("pubmsg", handler.clone()))
        .listener(ListenerSpec::on("pubmsg", handler).priority(Priority::LOWEST));
    let bot = engine(vec![module]);
    let server = MockServer::new("testnet");

    bot.dispatch(pubmsg(&server, "#chan", REGULAR, "hi")).await;
    bot.dispatch(pubmsg(&server, "#chan", REGULAR, "again")).await;

    assert!(seen.wait_for(2, WAIT).await);
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(seen.count(), 2);
}

#[tokio::test]
async fn inline_rewrites_reach_the_router() {
    let calls = Recorder::new();
    let rewrite = ListenerHandler::new(|mut event: Event| async move {
        if event.message() == Some("!dice") {
            event.arguments = vec![".roll 1d6".to_string()];
        }
        Ok(Some(event))
    });
    let module = ScriptedModule::new("dice")
        .listener(ListenerSpec::on("pubmsg", rewrite).priority(Priority::HIGHEST).inline())
        .command(Command::new("roll", recording_command(&calls)));
    let bot = engine(vec![module]);
    let server = MockServer::new("testnet");

    let out = bot.dispatch(pubmsg(&server, "#chan", REGULAR, "!dice")).await;
    assert_eq!(out.message(), Some(".roll 1d6"));
    assert!(calls.wait_for(1, WAIT).await);
    assert_eq!(calls.items()[0].invocation.arguments, "1d6");
}

#[tokio::test]
async fn accounts_are_attached_before_listeners() {
    let seen = Recorder::new();
    let module = ScriptedModule::new("watch")
        .listener(ListenerSpec::on("pubmsg", recording_listener(&seen)).inline());
    let bot = engine(vec![module]);
    let server = MockServer::new("testnet");

    let out = bot.dispatch(pubmsg(&server, "#chan", ADMIN, "hello")).await;
    assert_eq!(out.source_account.as_deref(), Some("root"));
    assert_eq!(out.source_user_level, Some(UserLevel::ADMIN));
    assert_eq!(seen.items()[0].source_user_level, Some(UserLevel::ADMIN));

    let anonymous = bot.dispatch(pubmsg(&server, "#chan", "stranger", "hello")).await;
    assert_eq!(anonymous.source_account, None);
    assert_eq!(anonymous.source_user_level, Some(UserLevel::NO_PRIVS));
}

#[tokio::test]
async fn failing_handlers_do_not_disturb_dispatch() {
    let calls = Recorder::new();
    let panicking = CommandHandler::new(|_ctx| async {
        if explode() {
            panic!("handler blew up");
        }
        Ok(())
    });
    let failing = CommandHandler::new(|_ctx| async { Err("handler failed".into()) });
    let module = ScriptedModule::new("flaky")
        .command(Command::new("boom", panicking))
        .command(Command::new("fail", failing))
        .command(Command::new("ok", recording_command(&calls)));
    let bot = engine(vec![module]);
    let server = MockServer::new("testnet");

    bot.dispatch(pubmsg(&server, "#chan", REGULAR, ".boom")).await;
    bot.dispatch(pubmsg(&server, "#chan", REGULAR, ".fail")).await;
    bot.dispatch(pubmsg(&server, "#chan", REGULAR, ".ok")).await;
    bot.dispatch(pubmsg(&server, "#chan", REGULAR, ".ok")).await;

    assert!(calls.wait_for(2, WAIT).await);
}

#[tokio::test]
async fn replies_go_where_the_message_came_from() {
    let echo = CommandHandler::new(|ctx| async move {
        ctx.reply(&format!("echo: {}", ctx.invocation.arguments));
        Ok(())
    });
    let bot = engine(vec![ScriptedModule::new("echo").command(Command::new("echo", echo))]);
    let server = MockServer::new("testnet");

    bot.dispatch(pubmsg(&server, "#chan", REGULAR, ".echo hi there")).await;
    bot.dispatch(switchboard::testing::privmsg(&server, REGULAR, ".echo psst")).await;

    let channel = common::replies(&server, "#chan", 1).await;
    assert_eq!(channel, ["echo: hi there"]);
    let private = common::replies(&server, REGULAR, 1).await;
    assert_eq!(private, ["echo: psst"]);
}

fn explode() -> bool {
    true
}
