use super::*;

#[test]
fn parses_filter_with_name_verbatim() {
    assert_eq!(
        "filter Sepia".parse::<Command>(),
        Ok(Command::Filter("Sepia".into()))
    );
    assert_eq!(
        "  FILTER   BnW ".parse::<Command>(),
        Ok(Command::Filter("BnW".into()))
    );
}

#[test]
fn parses_bare_commands_case_insensitively() {
    assert_eq!("camera".parse::<Command>(), Ok(Command::Camera));
    assert_eq!("Photo".parse::<Command>(), Ok(Command::Photo));
    assert_eq!("show".parse::<Command>(), Ok(Command::Show));
    assert_eq!("hello".parse::<Command>(), Ok(Command::Hello));
    assert_eq!("data".parse::<Command>(), Ok(Command::Data));
    assert_eq!("inbox".parse::<Command>(), Ok(Command::Inbox));
    assert_eq!("?".parse::<Command>(), Ok(Command::Help));
    assert_eq!("exit".parse::<Command>(), Ok(Command::Quit));
}

#[test]
fn rejects_empty_unknown_and_incomplete_lines() {
    assert_eq!("   ".parse::<Command>(), Err(CommandError::Empty));
    assert_eq!(
        "dance".parse::<Command>(),
        Err(CommandError::Unknown("dance".into()))
    );
    assert_eq!(
        "filter".parse::<Command>(),
        Err(CommandError::MissingArgument("filter"))
    );
}
