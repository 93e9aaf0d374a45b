use yew::prelude::*;
use web_sys::HtmlInputElement;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AuthAction {
    Login,
    Register,
}

#[derive(Properties, PartialEq)]
pub struct AuthProps {
    pub error: Option<String>,
    pub on_submit: Callback<(AuthAction, String, String)>,
    pub on_toggle: Callback<()>,
}

#[function_component(AuthScreen)]
pub fn auth_screen(props: &AuthProps) -> Html {
    let username = use_state(String::new);
    let password = use_state(String::new);
    let action = use_state(|| AuthAction::Login);

    let on_username = {
        let username = username.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            username.set(input.value());
        })
    };

    let on_password = {
        let password = password.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            password.set(input.value());
        })
    };

    let on_submit = {
        let username = username.clone();
        let password = password.clone();
        let action = action.clone();
        let cb = props.on_submit.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            cb.emit((*action, (*username).clone(), (*password).clone()));
        })
    };

    let on_toggle = {
        let action = action.clone();
        let cb = props.on_toggle.clone();
        Callback::from(move |_| {
            action.set(match *action {
                AuthAction::Login => AuthAction::Register,
                AuthAction::Register => AuthAction::Login,
            });
            cb.emit(());
        })
    };

    let is_login = *action == AuthAction::Login;

    let css = r#"
        .auth-screen { display: flex; align-items: center; justify-content: center; height: 100vh; background: var(--bg-sidebar); }
        .auth-card { width: 360px; background: white; border: 1px solid var(--border-color); border-radius: 12px; padding: 32px; display: flex; flex-direction: column; gap: 14px; }
        .auth-card h1 { margin: 0; font-size: 1.6rem; text-align: center; }
        .auth-error { background: #fdecea; color: var(--danger-color); padding: 10px; border-radius: 6px; font-size: 0.85rem; }
        .auth-switch { background: none; border: none; color: var(--text-secondary); cursor: pointer; font-size: 0.85rem; }
    "#;

    html! {
        <>
            <style>{ css }</style>
            <div class="auth-screen">
                <form class="auth-card" onsubmit={on_submit}>
                    <h1>{ "NexusAI" }</h1>
                    if let Some(error) = &props.error {
                        <div class="auth-error">{ error }</div>
                    }
                    <label class="form-label">{ "Username" }</label>
                    <input class="form-input" type="text" value={(*username).clone()} oninput={on_username} />
                    <label class="form-label">{ "Password" }</label>
                    <input class="form-input" type="password" value={(*password).clone()} oninput={on_password} />
                    <button type="submit" class="btn btn-primary">
                        { if is_login { "Sign In" } else { "Create Account" } }
                    </button>
                    <button type="button" class="auth-switch" onclick={on_toggle}>
                        { if is_login { "Don't have an account? Sign up" } else { "Already have an account? Sign in" } }
                    </button>
                </form>
            </div>
        </>
    }
}
