//! 상태 패턴 매칭 -- 정규식 컴파일 및 토픽 템플릿 전개
//!
//! [`PatternSet`]은 상태 라벨에서 컴파일된 정규식으로 가는 순서 있는
//! 매핑입니다. 정규식은 설정 로딩 시 한 번만 컴파일하며, 평가 순서는
//! 항상 설정 선언 순서입니다.
//!
//! 한 라인에 여러 패턴이 매칭될 수 있고 각 매칭은 독립적으로
//! 평가됩니다. 논리적으로 배타적인 상태(open/closed)가 한 라인에서
//! 모두 매칭되면 두 전이가 모두 발생합니다. 이는 원 시스템의 동작을
//! 그대로 유지한 것입니다 ([`PatternSet::matches`] 참조).

use regex::{Captures, Regex};

use logsentry_core::config::StateRule;

use crate::error::TailError;

/// 컴파일된 상태 패턴 하나
#[derive(Debug)]
struct StatePattern {
    /// 상태 라벨
    label: String,
    /// 발행 페이로드 오버라이드 (없으면 라벨 그대로)
    payload: Option<String>,
    /// 컴파일된 정규식
    regex: Regex,
}

/// 상태 라벨 -> 정규식의 순서 있는 집합
///
/// 패턴은 [`PatternSet::compile`]에서 한 번만 컴파일되어 캐싱됩니다.
pub struct PatternSet {
    patterns: Vec<StatePattern>,
}

impl PatternSet {
    /// 상태 규칙 목록에서 패턴 집합을 컴파일합니다.
    ///
    /// 규칙의 배열 순서가 곧 평가 순서입니다. 정규식이 유효하지 않으면
    /// [`TailError::Pattern`]을 반환합니다 (시작 전 치명적).
    pub fn compile(rules: &[StateRule]) -> Result<Self, TailError> {
        let mut patterns = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = Regex::new(&rule.pattern).map_err(|e| TailError::Pattern {
                state: rule.state.clone(),
                reason: e.to_string(),
            })?;
            patterns.push(StatePattern {
                label: rule.state.clone(),
                payload: rule.payload.clone(),
                regex,
            });
        }
        Ok(Self { patterns })
    }

    /// 패턴 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// 패턴이 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// 선언 순서대로 평가하여 첫 매칭을 반환합니다.
    ///
    /// 결정적이고 부수효과가 없습니다.
    pub fn first_match<'p, 'l>(&'p self, line: &'l str) -> Option<PatternMatch<'p, 'l>> {
        self.matches(line).next()
    }

    /// 라인에 매칭되는 *모든* 패턴을 선언 순서대로 반환합니다.
    ///
    /// 피드의 라인 처리 경로는 이 반복자를 사용합니다. 각 매칭이
    /// 독립적으로 상태 전이를 만들 수 있습니다.
    pub fn matches<'p, 'l>(
        &'p self,
        line: &'l str,
    ) -> impl Iterator<Item = PatternMatch<'p, 'l>> {
        self.patterns.iter().filter_map(move |pattern| {
            pattern
                .regex
                .captures(line)
                .map(|captures| PatternMatch { pattern, captures })
        })
    }
}

/// 패턴 매칭 결과 하나 -- 상태 라벨과 캡처 그룹
pub struct PatternMatch<'p, 'l> {
    pattern: &'p StatePattern,
    captures: Captures<'l>,
}

impl PatternMatch<'_, '_> {
    /// 매칭된 상태 라벨을 반환합니다.
    pub fn label(&self) -> &str {
        &self.pattern.label
    }

    /// 버스로 내보낼 페이로드를 반환합니다 (오버라이드 또는 라벨).
    pub fn wire_payload(&self) -> &str {
        self.pattern.payload.as_deref().unwrap_or(&self.pattern.label)
    }

    /// named capture group의 값을 반환합니다.
    pub fn group(&self, name: &str) -> Option<&str> {
        self.captures.name(name).map(|m| m.as_str())
    }

    /// 토픽 템플릿을 이 매칭의 캡처 그룹으로 전개합니다.
    ///
    /// `{name}` 자리표시자는 해당 named group의 값으로 치환되며,
    /// 이 패턴에 없는 그룹은 빈 문자열이 됩니다. 닫히지 않은 `{`는
    /// 리터럴로 유지됩니다.
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            match rest[start + 1..].find('}') {
                Some(len) => {
                    let name = &rest[start + 1..start + 1 + len];
                    if let Some(m) = self.captures.name(name) {
                        out.push_str(m.as_str());
                    }
                    rest = &rest[start + 1 + len + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}
