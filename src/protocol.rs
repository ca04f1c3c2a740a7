pub const EXIT_DIRECTIVES: [&str; 4] = ["/quit", "/q", "/exit", "/part"];
pub const HELP_DIRECTIVES: [&str; 2] = ["/help", "/?"];

pub const NAME_PROMPT: &str = "Your username: ";
pub const HELP_HINT: &str = "type '/help' for help";
pub const HELP_TEXT: &str = "type '/exit' to exit";
pub const GOODBYE: &str = "Goodbye.";

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// What a line typed by an admitted member asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Exit,
    Help,
    Message(&'a str),
}

/// Directives are matched exactly; anything else is chat text.
pub fn parse_input(line: &str) -> Input<'_> {
    if EXIT_DIRECTIVES.contains(&line) {
        Input::Exit
    } else if HELP_DIRECTIVES.contains(&line) {
        Input::Help
    } else {
        Input::Message(line)
    }
}

pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(LINE_ENDINGS)
}

pub fn name_taken_prompt(name: &str) -> String {
    format!("'{}' is already in use.\nPlease choose a different username: ", name)
}

pub fn joined(name: &str) -> String {
    format!("{} has entered the room.", name)
}

pub fn left(name: &str) -> String {
    format!("{} has left the room.", name)
}

pub fn roster<S: AsRef<str>>(members: &[S]) -> String {
    let names: Vec<&str> = members.iter().map(AsRef::as_ref).collect();
    format!("In this room are: {}", names.join(", "))
}

pub fn chat_line(sender: &str, body: &str) -> String {
    format!("{}: {}", sender, body)
}
