use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A minimal namespace-stripped DOM, enough to express the `ElementTree`
/// `.find`/`.findtext`/`.findall(".//tag")`/`.get(attr)` calls the source parsers rely
/// on, without pulling in a full XML tree crate the teacher stack doesn't already
/// carry.
#[derive(Debug, Default)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub attrs: HashMap<String, String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn findtext<'a>(&'a self, name: &str) -> Option<&'a str> {
        self.find(name).map(|e| e.text.as_str()).filter(|s| !s.is_empty())
    }

    pub fn get(&self, attr: &str) -> Option<&str> {
        self.attrs.get(attr).map(String::as_str)
    }

    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_all(name, &mut out);
        out
    }

    fn collect_all<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_all(name, out);
        }
    }
}

fn local_name(qname: &quick_xml::name::QName<'_>) -> String {
    String::from_utf8_lossy(qname.local_name().as_ref()).into_owned()
}

fn attrs_of(tag: &BytesStart<'_>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for attr in tag.attributes().flatten() {
        let key = local_name(&attr.key);
        if let Ok(value) = attr.unescape_value() {
            map.insert(key, value.into_owned());
        }
    }
    map
}

pub fn parse(data: &[u8]) -> Result<Element, quick_xml::Error> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = vec![Element {
        name: "#root".into(),
        text: String::new(),
        attrs: HashMap::new(),
        children: Vec::new(),
    }];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                stack.push(Element {
                    name: local_name(&e.name()),
                    text: String::new(),
                    attrs: attrs_of(&e),
                    children: Vec::new(),
                });
            }
            Event::Empty(e) => {
                let el = Element {
                    name: local_name(&e.name()),
                    text: String::new(),
                    attrs: attrs_of(&e),
                    children: Vec::new(),
                };
                stack.last_mut().expect("root always present").children.push(el);
            }
            Event::Text(t) => {
                if let Ok(text) = t.unescape() {
                    stack.last_mut().expect("root always present").text.push_str(&text);
                }
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                stack.last_mut().expect("root always present").text.push_str(&text);
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    let el = stack.pop().expect("checked len > 1");
                    stack.last_mut().expect("root always present").children.push(el);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(stack.pop().unwrap())
}
