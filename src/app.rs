use std::rc::Rc;

use yew::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::components::{
    auth::{AuthAction, AuthScreen},
    chat_area::ChatArea,
    settings::SettingsModal,
    sidebar::Sidebar,
};
use crate::config::AppConfig;
use crate::models::{AppSettings, ImageAttachment};
use crate::services::auth::{AppContext, AuthService};
use crate::services::controller::{ConversationController, TurnInput};
use crate::services::export;
use crate::services::llm::GeminiGateway;
use crate::services::storage::{JsonStore, LocalStorage};

type Controller = ConversationController<LocalStorage, GeminiGateway>;

const GLOBAL_STYLES: &str = r#"
    :root {
        --bg-app: #ffffff;
        --bg-sidebar: #f9f9f9;
        --border-color: #e5e5e5;
        --text-primary: #333;
        --text-secondary: #666;
        --accent-color: #10a37f;
        --accent-hover: #1a7f64;
        --story-color: #b45309;
        --danger-color: #ef4444;
    }

    * { box-sizing: border-box; }
    body { margin: 0; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif; color: var(--text-primary); }

    .app-container { display: flex; height: 100vh; overflow: hidden; }
    .main-content { flex-grow: 1; display: flex; flex-direction: column; position: relative; background: var(--bg-app); }
    .header { padding: 10px 20px; border-bottom: 1px solid var(--border-color); display: flex; justify-content: space-between; align-items: center; height: 60px; }
    .header h2 { font-size: 1rem; margin: 0; font-weight: 600; overflow: hidden; white-space: nowrap; text-overflow: ellipsis; max-width: 500px; }
    .key-banner { background: #fef2f2; color: var(--danger-color); padding: 8px 20px; font-size: 0.85rem; border-bottom: 1px solid var(--danger-color); }

    .btn { cursor: pointer; border: 1px solid var(--border-color); background: white; padding: 8px 12px; border-radius: 6px; font-size: 0.9rem; transition: all 0.2s; color: var(--text-primary); }
    .btn:hover { background: #f0f0f0; }
    .btn-primary { background: var(--accent-color); color: white; border-color: transparent; }
    .btn-primary:hover { background: var(--accent-hover); }
    .btn-danger { color: var(--danger-color); border-color: var(--danger-color); }
    .btn-danger:hover { background: #fef2f2; }
    .btn-story { color: var(--story-color); border-color: var(--story-color); }
    .btn-icon { border: none; background: transparent; font-size: 1.2rem; padding: 5px; color: var(--text-secondary); }
    .btn-icon:hover { background: rgba(0,0,0,0.05); color: var(--text-primary); }

    .form-label { display: block; font-size: 0.85rem; font-weight: 600; margin-bottom: 5px; color: var(--text-secondary); }
    .form-input, .form-textarea { width: 100%; padding: 8px; border: 1px solid var(--border-color); border-radius: 6px; font-family: inherit; margin-bottom: 10px; }
    .form-input:focus, .form-textarea:focus { outline: 2px solid var(--accent-color); border-color: transparent; }

    .markdown-body { line-height: 1.6; font-size: 1rem; }
    .markdown-body pre { background: #2d2d2d; color: #fff; padding: 15px; border-radius: 6px; overflow-x: auto; }
    .markdown-body code { background: #f4f4f4; padding: 2px 4px; border-radius: 4px; font-family: monospace; font-size: 0.9em; }
    .markdown-body pre code { background: transparent; color: inherit; }
    .markdown-body p { margin-top: 0; margin-bottom: 1em; }
"#;

fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

#[function_component(App)]
pub fn app() -> Html {
    let config = use_memo((), |_| AppConfig::from_env());
    let auth = {
        let config = config.clone();
        use_memo((), move |_| AuthService::new(JsonStore::new(LocalStorage), config.auth.clone()))
    };
    let context = {
        let auth = auth.clone();
        use_state(move || auth.restore())
    };
    let auth_error = use_state(|| None::<String>);

    let on_auth = {
        let auth = auth.clone();
        let context = context.clone();
        let auth_error = auth_error.clone();
        Callback::from(move |(action, username, password): (AuthAction, String, String)| {
            let result = match action {
                AuthAction::Login => auth.login(&username, &password),
                AuthAction::Register => auth.register(&username, &password),
            };
            match result {
                Ok(ctx) => {
                    auth_error.set(None);
                    context.set(Some(ctx));
                }
                Err(e) => auth_error.set(Some(e.to_string())),
            }
        })
    };

    let on_auth_toggle = {
        let auth_error = auth_error.clone();
        Callback::from(move |_| auth_error.set(None))
    };

    let on_logout = {
        let auth = auth.clone();
        let context = context.clone();
        Callback::from(move |_| {
            auth.logout();
            context.set(None);
        })
    };

    html! {
        <>
            <style>{ GLOBAL_STYLES }</style>
            if let Some(ctx) = &*context {
                <ChatView context={ctx.clone()} config={(*config).clone()} on_logout={on_logout} />
            } else {
                <AuthScreen error={(*auth_error).clone()} on_submit={on_auth} on_toggle={on_auth_toggle} />
            }
        </>
    }
}

#[derive(Properties, PartialEq)]
struct ChatViewProps {
    context: AppContext,
    config: AppConfig,
    on_logout: Callback<()>,
}

#[function_component(ChatView)]
fn chat_view(props: &ChatViewProps) -> Html {
    let controller: Rc<Controller> = {
        let ctx = props.context.clone();
        let config = props.config.clone();
        use_memo(props.context.user.id.clone(), move |_| {
            ConversationController::new(ctx, JsonStore::new(LocalStorage), GeminiGateway::new(config.gateway))
                .with_failure_policy(config.failure_policy)
        })
    };
    let trigger = use_force_update();

    let sidebar_open = use_state(|| true);
    let show_settings = use_state(|| false);
    let pending_image = use_state(|| None::<ImageAttachment>);

    // --- ACTIONS ---

    let start_turn = {
        let controller = controller.clone();
        let trigger = trigger.clone();
        Callback::from(move |input: TurnInput| match controller.begin_turn(input) {
            Ok(pending) => {
                trigger.force_update();
                let controller = controller.clone();
                let trigger = trigger.clone();
                spawn_local(async move {
                    controller.complete_turn(pending).await;
                    trigger.force_update();
                });
            }
            Err(rejection) => tracing::debug!(?rejection, "turn not started"),
        })
    };

    let on_send = {
        let start_turn = start_turn.clone();
        let pending_image = pending_image.clone();
        Callback::from(move |text: String| {
            start_turn.emit(TurnInput {
                text,
                image: (*pending_image).clone(),
            });
            pending_image.set(None);
        })
    };

    let on_continue = {
        let start_turn = start_turn.clone();
        let controller = controller.clone();
        Callback::from(move |_| start_turn.emit(TurnInput::text(controller.mode().continue_prompt())))
    };

    let on_speak = {
        let controller = controller.clone();
        Callback::from(move |message_id: String| {
            let controller = controller.clone();
            spawn_local(async move { controller.speak_message(&message_id).await });
        })
    };

    let on_attach = {
        let pending_image = pending_image.clone();
        Callback::from(move |image: Option<ImageAttachment>| pending_image.set(image))
    };

    let on_new_chat = {
        let controller = controller.clone();
        let trigger = trigger.clone();
        let pending_image = pending_image.clone();
        Callback::from(move |_| {
            controller.new_chat();
            pending_image.set(None);
            trigger.force_update();
        })
    };

    let on_select_chat = {
        let controller = controller.clone();
        let trigger = trigger.clone();
        Callback::from(move |id: String| {
            if controller.select_session(&id) {
                trigger.force_update();
            }
        })
    };

    let on_delete_chat = {
        let controller = controller.clone();
        let trigger = trigger.clone();
        Callback::from(move |(e, id): (MouseEvent, String)| {
            e.stop_propagation();
            controller.delete_session(&id);
            trigger.force_update();
        })
    };

    let on_toggle_mode = {
        let controller = controller.clone();
        let trigger = trigger.clone();
        Callback::from(move |_| {
            let mode = controller.toggle_mode();
            tracing::info!(?mode, "mode switched");
            trigger.force_update();
        })
    };

    let on_export = {
        let controller = controller.clone();
        Callback::from(move |_| {
            if let Err(e) = export::download(&controller.export_bundle()) {
                tracing::error!(error = %e, "export failed");
            }
        })
    };

    let on_settings_save = {
        let controller = controller.clone();
        let show_settings = show_settings.clone();
        Callback::from(move |settings: AppSettings| {
            if controller.update_settings(&settings) {
                show_settings.set(false);
            }
        })
    };

    let on_clear_all_chats = {
        let controller = controller.clone();
        let trigger = trigger.clone();
        Callback::from(move |_| {
            if confirm("Irreversibly delete ALL chat history?") {
                controller.clear_history();
                trigger.force_update();
            }
        })
    };

    let close_settings = {
        let show_settings = show_settings.clone();
        Callback::from(move |_| show_settings.set(false))
    };

    let open_settings = {
        let show_settings = show_settings.clone();
        Callback::from(move |_| show_settings.set(true))
    };

    let toggle_sidebar = sidebar_open.clone();

    let user = &props.context.user;
    let mode = controller.mode();
    let active = controller.active();
    let has_key = controller.gateway().has_credential();
    let title = active
        .as_ref()
        .map(|c| c.title.clone())
        .unwrap_or_else(|| mode.default_title().to_string());
    let messages = active.map(|c| c.messages).unwrap_or_default();
    let mode_class = if mode.is_story() { "btn btn-story" } else { "btn" };

    html! {
        <div class="app-container">
            <Sidebar
                open={*sidebar_open}
                chats={controller.sessions()}
                active_chat_id={controller.active().map(|c| c.id)}
                message_count={controller.message_count()}
                username={user.username.clone()}
                is_admin={user.is_admin}
                has_key={has_key}
                mode={mode}
                on_select={on_select_chat}
                on_new={on_new_chat}
                on_delete={on_delete_chat}
                on_settings={open_settings}
                on_export={on_export}
                on_logout={props.on_logout.clone()}
            />

            <div class="main-content">
                <div class="header">
                    <div style="display: flex; gap: 10px; align-items: center; min-width: 0;">
                        <button class="btn-icon" onclick={Callback::from(move |_| toggle_sidebar.set(!*toggle_sidebar))} title="Toggle Menu">
                            <svg width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><line x1="3" y1="12" x2="21" y2="12"></line><line x1="3" y1="6" x2="21" y2="6"></line><line x1="3" y1="18" x2="21" y2="18"></line></svg>
                        </button>
                        <h2>{ title }</h2>
                    </div>
                    <button class={mode_class} onclick={on_toggle_mode} title="Switch mode">
                        { if mode.is_story() { "Story Forge" } else { "Standard" } }
                    </button>
                </div>

                if !has_key {
                    <div class="key-banner">{ "API key missing. Set NEXUS_API_KEY at build time to enable replies." }</div>
                }

                if *show_settings && user.is_admin {
                    <SettingsModal
                        settings={controller.settings()}
                        on_save={on_settings_save}
                        on_close={close_settings}
                        on_clear_chats={on_clear_all_chats}
                    />
                }

                <ChatArea
                    messages={messages}
                    is_loading={controller.is_busy()}
                    mode={mode}
                    pending_image={(*pending_image).clone()}
                    on_send={on_send}
                    on_speak={on_speak}
                    on_continue={on_continue}
                    on_attach={on_attach}
                />
            </div>
        </div>
    }
}
