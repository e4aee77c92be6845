//! The canonical string a publisher signs.

use crate::{Envelope, Error, MessageType, Result};

fn push(out: &mut String, name: &str, value: &str) {
  out.push_str(name);
  out.push('\n');
  out.push_str(value);
  out.push('\n');
}

/// Build the `name\nvalue\n` sequence for `envelope`, fields in ascending
/// name order.
///
/// Only `Notification` and `SubscriptionConfirmation` envelopes are signed
/// this way; anything else is an error. `Subject` is included only when
/// present and non-empty.
pub fn string_to_sign(envelope: &Envelope) -> Result<String> {
  let mut out = String::with_capacity(envelope.message.len() + 256);

  match envelope.kind() {
    Some(MessageType::Notification) => {
      push(&mut out, "Message", &envelope.message);
      push(&mut out, "MessageId", &envelope.message_id);
      if let Some(subject) = envelope.subject.as_deref().filter(|s| !s.is_empty()) {
        push(&mut out, "Subject", subject);
      }
      push(&mut out, "Timestamp", &envelope.timestamp);
      push(&mut out, "TopicArn", &envelope.topic_arn);
      push(&mut out, "Type", &envelope.message_type);
    }
    Some(MessageType::SubscriptionConfirmation) => {
      push(&mut out, "Message", &envelope.message);
      push(&mut out, "MessageId", &envelope.message_id);
      push(&mut out, "SubscribeURL", envelope.subscribe_url.as_deref().unwrap_or_default());
      push(&mut out, "Timestamp", &envelope.timestamp);
      push(&mut out, "Token", envelope.token.as_deref().unwrap_or_default());
      push(&mut out, "TopicArn", &envelope.topic_arn);
      push(&mut out, "Type", &envelope.message_type);
    }
    _ => return Err(Error::UnsupportedMessageType(envelope.message_type.clone())),
  }

  Ok(out)
}
