use yew::prelude::*;
use web_sys::{HtmlInputElement, HtmlTextAreaElement};
use crate::models::{AppSettings, CreativeLevel};

#[derive(Properties, PartialEq, Clone)]
pub struct SettingsProps {
    pub settings: AppSettings,
    pub on_save: Callback<AppSettings>,
    pub on_close: Callback<()>,
    pub on_clear_chats: Callback<()>,
}

/// Admin-only kernel panel. Edits a draft and only persists on save.
#[function_component(SettingsModal)]
pub fn settings_modal(props: &SettingsProps) -> Html {
    let draft = use_state(|| props.settings.clone());

    let on_rule_input = {
        let draft = draft.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlTextAreaElement = e.target_unchecked_into();
            draft.set(AppSettings { system_rule: input.value(), ..(*draft).clone() });
        })
    };

    let on_knowledge_input = {
        let draft = draft.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlTextAreaElement = e.target_unchecked_into();
            draft.set(AppSettings { global_knowledge: input.value(), ..(*draft).clone() });
        })
    };

    let on_temperature_input = {
        let draft = draft.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            if let Ok(temperature) = input.value().parse::<f32>() {
                draft.set(AppSettings { temperature, ..(*draft).clone() });
            }
        })
    };

    let on_save_click = {
        let draft = draft.clone();
        let cb = props.on_save.clone();
        Callback::from(move |_| cb.emit((*draft).clone()))
    };

    let css = r#"
        .settings-backdrop { position: absolute; top: 0; left: 0; width: 100%; height: 100%; background: rgba(255,255,255,0.6); backdrop-filter: blur(2px); z-index: 99; cursor: pointer; }
        .settings-panel { position: absolute; top: 60px; right: 20px; width: 380px; background: white; border: 1px solid var(--border-color); border-radius: 8px; box-shadow: 0 10px 15px -3px rgba(0, 0, 0, 0.1); padding: 20px; z-index: 100; display: flex; flex-direction: column; gap: 15px; }
        .settings-header { display: flex; justify-content: space-between; align-items: center; border-bottom: 1px solid var(--border-color); padding-bottom: 10px; margin-bottom: 5px; }
        .settings-header h3 { margin: 0; font-size: 1.1rem; }
        .close-btn { background: none; border: none; font-size: 1.5rem; line-height: 1; cursor: pointer; color: var(--text-secondary); padding: 0 5px; }
        .close-btn:hover { color: var(--text-primary); }
        .level-group { display: flex; gap: 8px; }
        .level-group .btn { flex: 1; }
        .level-group .btn.selected { background: var(--accent-color); color: white; border-color: var(--accent-color); }
        .actions { margin-top: 10px; display: flex; flex-direction: column; gap: 8px; }
    "#;

    html! {
        <>
            <style>{ css }</style>
            <div class="settings-backdrop" onclick={props.on_close.reform(|_| ())}></div>

            <div class="settings-panel">
                <div class="settings-header">
                    <h3>{ "Kernel Access" }</h3>
                    <button class="close-btn" onclick={props.on_close.reform(|_| ())} title="Close">{"×"}</button>
                </div>

                <div>
                    <label class="form-label">{ "System Rule" }</label>
                    <textarea class="form-textarea" value={draft.system_rule.clone()} oninput={on_rule_input} style="height: 100px; resize: none;" />
                </div>

                <div>
                    <label class="form-label">{ "Global Knowledge" }</label>
                    <textarea class="form-textarea" value={draft.global_knowledge.clone()} oninput={on_knowledge_input} style="height: 80px; resize: none;" />
                </div>

                <div>
                    <label class="form-label">{ format!("Temperature: {:.2}", draft.temperature) }</label>
                    <input type="range" min="0" max="1" step="0.05" value={draft.temperature.to_string()} oninput={on_temperature_input} style="width: 100%;" />
                </div>

                <div>
                    <label class="form-label">{ "Creative Level" }</label>
                    <div class="level-group">
                        { for CreativeLevel::ALL.iter().map(|level| {
                            let level = *level;
                            let selected = if draft.creative_level == level { "selected" } else { "" };
                            let draft = draft.clone();
                            html! {
                                <button class={classes!("btn", selected)} onclick={Callback::from(move |_| draft.set((*draft).clone().with_creative_level(level)))}>
                                    { level.as_str() }
                                </button>
                            }
                        })}
                    </div>
                </div>

                <div class="actions">
                    <button class="btn btn-primary" onclick={on_save_click}>{ "Save" }</button>
                    <hr style="width: 100%; border: 0; border-top: 1px solid var(--border-color);" />
                    <button class="btn btn-danger" onclick={props.on_clear_chats.reform(|_| ())}>{ "Delete All Chats" }</button>
                </div>
            </div>
        </>
    }
}
