//! Gateway-originated messages to the realtime peer

use serde_json::{json, Map, Value};

use voice_gateway_config::{Persona, ToolSchema};

/// Build the `session.update` that configures a fresh upstream session with
/// the selected persona: voice, instructions, tool schemas, PCM16 audio on
/// both directions, and server-side VAD with the persona's parameters.
pub fn session_update(persona: &Persona) -> Value {
    json!({
        "type": "session.update",
        "session": {
            "modalities": ["text", "audio"],
            "voice": persona.voice_id,
            "instructions": persona.instructions,
            "tools": persona.tools.iter().map(tool_definition).collect::<Vec<_>>(),
            "input_audio_format": "pcm16",
            "output_audio_format": "pcm16",
            "turn_detection": {
                "type": "server_vad",
                "threshold": persona.vad.threshold,
                "prefix_padding_ms": persona.vad.prefix_padding_ms,
                "silence_duration_ms": persona.vad.silence_duration_ms,
                "create_response": persona.vad.create_response,
            },
        }
    })
}

/// Build the one-shot `response.create` that makes the agent speak its
/// introduction as soon as the session is configured.
pub fn greeting_request(persona: &Persona) -> Value {
    json!({
        "type": "response.create",
        "response": {
            "instructions": format!(
                "Open the conversation by saying: {}",
                persona.intro_utterance
            ),
        }
    })
}

/// Map a configured tool schema to the realtime function-tool format.
fn tool_definition(schema: &ToolSchema) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, spec) in &schema.arguments {
        let mut property = Map::new();
        property.insert("type".to_string(), Value::String(spec.arg_type.clone()));
        if let Some(description) = &spec.description {
            property.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }
        properties.insert(name.clone(), Value::Object(property));
        if spec.required {
            required.push(Value::String(name.clone()));
        }
    }

    json!({
        "type": "function",
        "name": schema.name,
        "description": schema.description,
        "parameters": {
            "type": "object",
            "properties": properties,
            "required": required,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use voice_gateway_config::{ToolArgSpec, VadParams};

    fn persona() -> Persona {
        let mut arguments = BTreeMap::new();
        arguments.insert(
            "query".to_string(),
            ToolArgSpec {
                arg_type: "string".to_string(),
                required: true,
                description: Some("What to look up".to_string()),
            },
        );
        Persona {
            role_id: "general_assistant".to_string(),
            voice_id: "alloy".to_string(),
            intro_utterance: "Hi there!".to_string(),
            instructions: "Help with product questions.".to_string(),
            tools: vec![ToolSchema {
                name: "search_knowledge_base".to_string(),
                description: "Search the knowledge base".to_string(),
                arguments,
            }],
            vad: VadParams {
                threshold: 0.6,
                prefix_padding_ms: 240,
                silence_duration_ms: 700,
                create_response: true,
            },
            handoff_delay_ms: 1500,
        }
    }

    #[test]
    fn test_session_update_shape() {
        let update = session_update(&persona());
        assert_eq!(update["type"], "session.update");
        let session = &update["session"];
        assert_eq!(session["modalities"], json!(["text", "audio"]));
        assert_eq!(session["voice"], "alloy");
        assert_eq!(session["input_audio_format"], "pcm16");
        assert_eq!(session["output_audio_format"], "pcm16");
        assert_eq!(session["turn_detection"]["type"], "server_vad");
        assert_eq!(session["turn_detection"]["threshold"], 0.6);
        assert_eq!(session["turn_detection"]["silence_duration_ms"], 700);
        assert_eq!(session["turn_detection"]["create_response"], true);
    }

    #[test]
    fn test_tools_mapped_to_function_format() {
        let update = session_update(&persona());
        let tools = update["session"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["name"], "search_knowledge_base");
        assert_eq!(tools[0]["parameters"]["type"], "object");
        assert_eq!(
            tools[0]["parameters"]["properties"]["query"]["type"],
            "string"
        );
        assert_eq!(tools[0]["parameters"]["required"], json!(["query"]));
    }

    #[test]
    fn test_greeting_request_carries_intro() {
        let greeting = greeting_request(&persona());
        assert_eq!(greeting["type"], "response.create");
        assert!(greeting["response"]["instructions"]
            .as_str()
            .unwrap()
            .contains("Hi there!"));
    }
}
