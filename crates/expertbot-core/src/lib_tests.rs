#[cfg(test)]
mod tests {
    use crate::{Message, Sender, Session, WELCOME_TEXT};
    use chrono::Utc;

    #[test]
    fn test_welcome_message() {
        let msg = Message::welcome();
        assert_eq!(msg.sender, Sender::Bot);
        assert_eq!(msg.content, WELCOME_TEXT);
    }

    #[test]
    fn test_session_round_trip_keeps_order() {
        let messages = vec![
            Message::welcome(),
            Message::user("What are the leave rules?"),
            Message::bot("Rule 12 covers leave."),
        ];
        let session = Session::new(messages.clone(), Utc::now());

        let json = serde_json::to_string(&vec![session.clone()]).unwrap();
        let loaded: Vec<Session> = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, session.id);
        assert_eq!(loaded[0].messages, messages);
    }

    #[test]
    fn test_session_json_uses_date_key() {
        let session = Session::new(vec![Message::user("q")], Utc::now());
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["date"], "Just now");
        assert!(json.get("last_activity").is_none());
    }
}
