use ferrochain_prompt::PromptTemplate;

pub const OBSERVATION_PREFIX: &str = "Observation: ";
pub const LLM_PREFIX: &str = "Thought:";

/// Appended to the scratchpad for the one extra planning call made when a
/// run stops early with the `generate` method.
pub const FINAL_ANSWER_INSTRUCTION: &str =
    "\n\nI now need to return a final answer based on the previous steps:";

pub const STOPPED_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

/// Sections an agent prompt is assembled from. `{{tools}}` is placed between
/// the prefix and the format instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLayout {
    pub prefix: &'static str,
    pub format_instructions: &'static str,
    pub suffix: &'static str,
    /// Put in front of a non-empty scratchpad.
    pub scratchpad_preamble: Option<&'static str>,
}

impl PromptLayout {
    pub fn template(&self) -> PromptTemplate {
        PromptTemplate::new(
            [self.prefix, "{{tools}}", self.format_instructions, self.suffix].join("\n\n"),
        )
    }
}

pub const ZERO_SHOT_REACT: PromptLayout = PromptLayout {
    prefix: "Answer the following questions as best you can. You have access to the following tools:",
    format_instructions: "Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{{tool_names}}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question",
    suffix: "Begin!

Question: {{input}}
Thought:{{agent_scratchpad}}",
    scratchpad_preamble: None,
};

pub const CHAT_ZERO_SHOT_REACT: PromptLayout = PromptLayout {
    prefix: "Answer the following questions as best you can. You have access to the following tools:",
    format_instructions: "The way you use the tools is by specifying a json blob.
Specifically, this json should have a `action` key (with the name of the tool to use) and a `action_input` key (with the input to the tool going here).

The only values that should be in the \"action\" field are: {{tool_names}}

The $JSON_BLOB should only contain a SINGLE action, do NOT return a list of multiple actions. Here is an example of a valid $JSON_BLOB:

```
{
  \"action\": $TOOL_NAME,
  \"action_input\": $INPUT
}
```

ALWAYS use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action:
```
$JSON_BLOB
```
Observation: the result of the action
... (this Thought/Action/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question",
    suffix: "Begin! Reminder to always use the exact characters `Final Answer` when responding.

{{input}}

{{agent_scratchpad}}",
    scratchpad_preamble: Some(
        "This was your previous work (but I haven't seen any of it! I only see what you return as final answer):\n",
    ),
};

pub const STRUCTURED_CHAT_ZERO_SHOT_REACT: PromptLayout = PromptLayout {
    prefix: "Respond to the human as helpfully and accurately as possible. You have access to the following tools:",
    format_instructions: "Use a json blob to specify a tool by providing an action key (tool name) and an action_input key (tool input).

Valid \"action\" values: \"Final Answer\" or {{tool_names}}

Provide only ONE action per $JSON_BLOB, as shown:

```
{
  \"action\": $TOOL_NAME,
  \"action_input\": $INPUT
}
```

Follow this format:

Question: input question to answer
Thought: consider previous and subsequent steps
Action:
```
$JSON_BLOB
```
Observation: action result
... (repeat Thought/Action/Observation N times)
Thought: I know what to respond
Action:
```
{
  \"action\": \"Final Answer\",
  \"action_input\": \"Final response to human\"
}
```",
    suffix: "Begin! Reminder to ALWAYS respond with a valid json blob of a single action. Use tools if necessary. Respond directly if appropriate. Format is Action:```$JSON_BLOB```then Observation:.

{{input}}

{{agent_scratchpad}}",
    scratchpad_preamble: Some(
        "This was your previous work (but I haven't seen any of it! I only see what you return as final answer):\n",
    ),
};
