use anyhow::{Result, bail};
use std::io::{self, IsTerminal};
use zeroize::Zeroizing;

pub const PASSPHRASE_ENV: &str = "EKTOKEN_PASSPHRASE";
pub const PASSWORD_ENV: &str = "EKTOKEN_PASSWORD";

/// Read a secret from `env_var`, piped stdin, or an interactive prompt, in
/// that order.
pub fn read_secret(env_var: &str, prompt: &str) -> Result<Zeroizing<String>> {
    //  EKTOKEN_PASSPHRASE="supersecret" ektoken encrypt hello
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return Ok(Zeroizing::new(value));
        }
    }

    //  printf "%s" "$SECRET" | ektoken decrypt U2FsdGVkX1...
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(buf);
        }
    } else {
        let value = Zeroizing::new(rpassword::prompt_password(prompt)?);
        if !value.is_empty() {
            return Ok(value);
        }
    }

    bail!("No {} provided", prompt.trim_end_matches([':', ' ']).to_lowercase())
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
