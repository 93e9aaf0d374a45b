use yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{FileReader, HtmlElement, HtmlInputElement, HtmlTextAreaElement};

use crate::models::{ImageAttachment, Message, Mode, Role};
use crate::utils::render_markdown;

#[derive(Properties, PartialEq)]
pub struct ChatAreaProps {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub mode: Mode,
    pub pending_image: Option<ImageAttachment>,
    pub on_send: Callback<String>,
    pub on_speak: Callback<String>,
    pub on_continue: Callback<()>,
    pub on_attach: Callback<Option<ImageAttachment>>,
}

fn reader_from_event(event: &JsValue) -> Option<FileReader> {
    let target = event.dyn_ref::<web_sys::Event>()?.target()?;
    target.dyn_ref::<FileReader>().cloned()
}

/// Reads the first selected file as a data URL and hands it to `on_attach`.
fn read_attachment(input: &HtmlInputElement, on_attach: Callback<Option<ImageAttachment>>) {
    let Some(file) = input.files().and_then(|files| files.get(0)) else {
        return;
    };
    let reader = match FileReader::new() {
        Ok(reader) => reader,
        Err(e) => {
            tracing::error!(error = ?e, "failed to create FileReader");
            return;
        }
    };

    let onload = Closure::once_into_js(move |event: JsValue| {
        let attachment = reader_from_event(&event)
            .and_then(|reader| reader.result().ok())
            .and_then(|result| result.as_string())
            .and_then(|url| ImageAttachment::from_data_url(&url));
        if attachment.is_none() {
            tracing::warn!("attached file could not be read as an image");
        }
        on_attach.emit(attachment);
    });
    reader.set_onload(Some(onload.unchecked_ref()));

    if let Err(e) = reader.read_as_data_url(&file) {
        tracing::error!(error = ?e, "failed to read attached file");
    }
    input.set_value("");
}

#[function_component(ChatArea)]
pub fn chat_area(props: &ChatAreaProps) -> Html {
    let input_text = use_state(String::new);
    let scroll_ref = use_node_ref();
    let file_ref = use_node_ref();

    // Track if the user is currently at the bottom of the chat
    let is_at_bottom = use_state(|| true);

    {
        let div_ref = scroll_ref.clone();
        let is_at_bottom_val = *is_at_bottom;
        let len = props.messages.len();
        let loading = props.is_loading;

        use_effect_with((len, loading), move |_| {
            if is_at_bottom_val {
                if let Some(div) = div_ref.cast::<HtmlElement>() {
                    div.set_scroll_top(div.scroll_height());
                }
            }
        });
    }

    let on_scroll = {
        let is_at_bottom = is_at_bottom.clone();
        Callback::from(move |e: Event| {
            let div: HtmlElement = e.target_unchecked_into();
            let distance_from_bottom = div.scroll_height() - div.scroll_top() - div.client_height();
            let currently_at_bottom = distance_from_bottom < 35;

            if *is_at_bottom != currently_at_bottom {
                is_at_bottom.set(currently_at_bottom);
            }
        })
    };

    // An attached image alone is enough to send.
    let can_send = !props.is_loading
        && (!input_text.trim().is_empty() || props.pending_image.is_some());

    let send = {
        let text = input_text.clone();
        let on_send = props.on_send.clone();
        let is_at_bottom = is_at_bottom.clone();
        Callback::from(move |_: ()| {
            on_send.emit((*text).clone());
            text.set(String::new());
            is_at_bottom.set(true);
        })
    };

    let on_submit = {
        let send = send.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if can_send {
                send.emit(());
            }
        })
    };

    let on_keydown = {
        let send = send.clone();
        Callback::from(move |e: KeyboardEvent| {
            if e.key() == "Enter" && !e.shift_key() {
                e.prevent_default();
                if can_send {
                    send.emit(());
                }
            }
        })
    };

    let on_input = {
        let text = input_text.clone();
        Callback::from(move |e: InputEvent| {
            let i: HtmlTextAreaElement = e.target_unchecked_into();
            text.set(i.value());
        })
    };

    let on_pick = {
        let file_ref = file_ref.clone();
        Callback::from(move |_| {
            if let Some(input) = file_ref.cast::<HtmlInputElement>() {
                input.click();
            }
        })
    };

    let on_file_change = {
        let on_attach = props.on_attach.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            read_attachment(&input, on_attach.clone());
        })
    };

    let on_starter = {
        let on_send = props.on_send.clone();
        move |prompt: &'static str| {
            let on_send = on_send.clone();
            Callback::from(move |_| on_send.emit(prompt.to_string()))
        }
    };

    let css = r#"
        .messages-container {
            flex-grow: 1;
            overflow-y: auto;
            padding: 20px;
            display: flex;
            flex-direction: column;
            gap: 15px;
            background-color: #ffffff;
            scroll-behavior: smooth;
        }

        .message-row { display: flex; width: 100%; }
        .message-row.user { justify-content: flex-end; }
        .message-row.model { justify-content: flex-start; }

        .bubble-group { display: flex; gap: 10px; max-width: 85%; align-items: flex-end; }
        .message-row.user .bubble-group { flex-direction: row-reverse; }

        .avatar { width: 36px; height: 36px; border-radius: 50%; display: flex; align-items: center; justify-content: center; flex-shrink: 0; font-size: 0.65rem; font-weight: 700; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        .avatar.user { background: #555; color: white; }
        .avatar.model { background: var(--accent-color); color: white; }
        .avatar.model.story { background: var(--story-color); }

        .msg-bubble {
            padding: 10px 15px;
            border-radius: 12px;
            font-size: 0.95rem;
            line-height: 1.5;
            box-shadow: 0 1px 2px rgba(0,0,0,0.05);
            min-width: 0;
            overflow-wrap: anywhere;
            word-break: break-word;
            max-width: 100%;
        }
        .msg-bubble img { max-width: 100%; border-radius: 8px; margin-top: 6px; display: block; }

        .message-row.user .msg-bubble { background-color: #e3f2fd; color: #1565c0; border-bottom-right-radius: 2px; }
        .message-row.model .msg-bubble { background-color: #f5f5f5; color: #333; border-bottom-left-radius: 2px; }

        .msg-actions { margin-top: 4px; display: flex; gap: 6px; }
        .msg-actions button { border: none; background: none; color: var(--text-secondary); cursor: pointer; font-size: 0.8rem; padding: 2px 4px; }
        .msg-actions button:hover { color: var(--text-primary); }

        .starters { margin: auto; display: flex; flex-wrap: wrap; gap: 10px; justify-content: center; max-width: 700px; }
        .starter { border: 1px solid var(--border-color); background: white; border-radius: 8px; padding: 12px; cursor: pointer; font-size: 0.9rem; color: var(--text-primary); }
        .starter:hover { border-color: var(--accent-color); }

        .continue-btn { align-self: center; border: 1px dashed var(--story-color); color: var(--story-color); background: white; border-radius: 20px; padding: 6px 16px; cursor: pointer; }

        .input-wrapper { border-top: 1px solid var(--border-color); padding: 20px; display: flex; justify-content: center; background: white; position: relative; }
        .input-container { width: 100%; max-width: 900px; position: relative; display: flex; flex-direction: column; gap: 8px; }
        .chat-input { width: 100%; padding: 12px; padding-left: 45px; padding-right: 70px; border: 1px solid var(--border-color); border-radius: 8px; box-shadow: 0 2px 5px rgba(0,0,0,0.05); resize: none; font-family: inherit; outline: none; transition: border 0.2s; }
        .chat-input:focus { border-color: var(--accent-color); box-shadow: 0 0 0 2px rgba(16, 163, 127, 0.1); }
        .attach-btn { position: absolute; left: 8px; bottom: 8px; background: none; border: none; cursor: pointer; font-size: 1.2rem; color: var(--text-secondary); }
        .send-btn { position: absolute; right: 8px; bottom: 8px; background: var(--accent-color); color: white; border: none; border-radius: 4px; padding: 6px 10px; cursor: pointer; transition: opacity 0.2s; }
        .send-btn:disabled { background: #ccc; cursor: default; }
        .send-btn:hover:not(:disabled) { background: var(--accent-hover); }

        .pending-image { display: flex; align-items: center; gap: 8px; font-size: 0.8rem; color: var(--text-secondary); }
        .pending-image img { height: 48px; border-radius: 6px; }
        .pending-image button { border: none; background: none; cursor: pointer; color: var(--danger-color); }
    "#;

    let story_class = if props.mode.is_story() { "story" } else { "" };
    let last_is_model = props.messages.last().map(|m| m.role == Role::Model).unwrap_or(false);

    html! {
        <>
            <style>{ css }</style>

            <div class="messages-container" ref={scroll_ref} onscroll={on_scroll}>
                if props.messages.is_empty() && !props.is_loading {
                    <div class="starters">
                        { for props.mode.starter_prompts().iter().map(|prompt| html! {
                            <button class="starter" onclick={on_starter(*prompt)}>{ *prompt }</button>
                        })}
                    </div>
                }

                { for props.messages.iter().map(|msg| {
                    let role_cls = msg.role.as_str();
                    let label = match msg.role {
                        Role::User => "YOU",
                        Role::Model => props.mode.model_label(),
                    };
                    let actions = if msg.role == Role::Model {
                        let on_speak = props.on_speak.clone();
                        let id = msg.id.clone();
                        html! {
                            <div class="msg-actions">
                                <button title="Read aloud" onclick={Callback::from(move |_| on_speak.emit(id.clone()))}>{ "🔊" }</button>
                            </div>
                        }
                    } else {
                        html! {}
                    };

                    html! {
                        <div class={format!("message-row {}", role_cls)}>
                            <div class="bubble-group">
                                <div class={classes!("avatar", role_cls, story_class)}>{ label }</div>
                                <div>
                                    <div class="msg-bubble">
                                        { render_markdown(&msg.content) }
                                        if let Some(url) = &msg.image_url {
                                            <img src={url.clone()} alt="attachment" />
                                        }
                                    </div>
                                    { actions }
                                </div>
                            </div>
                        </div>
                    }
                })}

                if props.is_loading {
                    <div class="message-row model">
                        <div class="bubble-group">
                            <div class={classes!("avatar", "model", story_class)}>{ props.mode.model_label() }</div>
                            <div class="msg-bubble" style="color: #888; font-style: italic;">
                                { "Thinking..." }
                            </div>
                        </div>
                    </div>
                } else if props.mode.is_story() && last_is_model {
                    <button class="continue-btn" onclick={props.on_continue.reform(|_| ())}>
                        { props.mode.continue_prompt() }
                    </button>
                }
            </div>

            <div class="input-wrapper">
                <form class="input-container" onsubmit={on_submit}>
                    if let Some(image) = &props.pending_image {
                        <div class="pending-image">
                            <img src={image.data_url()} alt="pending attachment" />
                            <span>{ &image.mime_type }</span>
                            <button type="button" onclick={props.on_attach.reform(|_| None)}>{ "×" }</button>
                        </div>
                    }
                    <div style="position: relative;">
                        <input type="file" accept="image/*" ref={file_ref} onchange={on_file_change} style="display: none;" />
                        <button type="button" class="attach-btn" title="Attach image" onclick={on_pick} disabled={props.is_loading}>{ "📎" }</button>
                        <textarea
                            class="chat-input"
                            rows="1"
                            placeholder={if props.mode.is_story() { "Write the next beat of the story..." } else { "Message NexusAI..." }}
                            value={(*input_text).clone()}
                            oninput={on_input}
                            onkeydown={on_keydown}
                            disabled={props.is_loading}
                            style="height: 50px; overflow-y: hidden;"
                        />
                        <button type="submit" class="send-btn" disabled={!can_send}>
                            { "Send" }
                        </button>
                    </div>
                </form>
            </div>
        </>
    }
}
